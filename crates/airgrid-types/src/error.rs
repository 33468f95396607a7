//! Error types for airgrid-types.

use thiserror::Error;

use crate::feedback::FeedbackState;

/// Errors that can occur when decoding stored or transmitted values into
/// domain types.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// Generic invalid data.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Unknown feedback state code.
    #[error("Unknown feedback state: {0}")]
    UnknownState(i64),

    /// Unknown inspector availability code.
    #[error("Unknown inspector availability: {0}")]
    UnknownAvailability(i64),

    /// Unknown pollutant channel name.
    #[error("Unknown pollutant: {0}")]
    UnknownPollutant(String),

    /// Level identifier outside `1..=255`.
    #[error("Invalid classification level: {0}")]
    InvalidLevel(i64),
}

/// Result type alias using airgrid-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;

/// A feedback state change that the lifecycle does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Cannot transition feedback from {from} to {to}")]
pub struct TransitionError {
    /// State the record was in.
    pub from: FeedbackState,
    /// State that was requested.
    pub to: FeedbackState,
}
