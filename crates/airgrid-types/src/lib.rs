//! Platform-agnostic types for the airgrid feedback workflow.
//!
//! This crate provides the shared vocabulary used by the storage layer and the
//! services built on top of it:
//!
//! - [`FeedbackState`] and its forward-only lifecycle
//! - [`Feedback`], [`Inspector`] and [`Measurement`] records
//! - [`RangeTable`], the pollutant classification engine
//!
//! # Features
//!
//! - `serde` (default): `Serialize`/`Deserialize` for all records. Dates and
//!   times use the text formats in [`wire`].

pub mod classification;
pub mod error;
pub mod feedback;
pub mod inspector;
pub mod location;
pub mod measurement;
pub mod wire;

pub use classification::{
    Assessment, Bounds, Classification, ClassifyError, Level, Pollutant, PollutantLevels, PollutantRange,
    RangeTable, RangeTableError, combine,
};
pub use error::{ParseError, ParseResult, TransitionError};
pub use feedback::{
    Assignment, Feedback, FeedbackState, MAX_ESTIMATED_GRADE, MIN_ESTIMATED_GRADE, is_valid_grade,
};
pub use inspector::{Availability, Inspector, Region};
pub use location::{City, Province};
pub use measurement::Measurement;
