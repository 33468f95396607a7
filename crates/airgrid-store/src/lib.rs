//! SQLite persistence for the airgrid feedback workflow.
//!
//! This crate stores feedback reports, the inspector roster, administrative
//! regions and confirmed measurements.
//!
//! # Features
//!
//! - Forward-only feedback state changes as conditional updates inside
//!   `BEGIN IMMEDIATE` transactions
//! - At most one measurement per feedback
//! - Filtered, paginated listings via [`FeedbackQuery`] and [`MeasurementQuery`]
//!
//! # Example
//!
//! ```
//! use airgrid_store::{FeedbackQuery, Store};
//!
//! let mut store = Store::open_in_memory()?;
//!
//! let pending = store.query_feedback(&FeedbackQuery::new().province(1))?;
//! assert!(pending.is_empty());
//!
//! let tx = store.transaction()?;
//! assert!(!tx.mark_confirmed(1, 1)?);
//! # Ok::<(), airgrid_store::Error>(())
//! ```

mod error;
mod models;
mod queries;
mod schema;
mod store;

pub use error::{Error, Result};
pub use models::{NewFeedback, NewInspector, NewMeasurement};
pub use queries::{FeedbackOrder, FeedbackQuery, MeasurementQuery};
pub use store::{DEFAULT_BUSY_TIMEOUT, Store, StoreTx};

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/airgrid/airgrid.db`
/// - macOS: `~/Library/Application Support/airgrid/airgrid.db`
/// - Windows: `C:\Users\<user>\AppData\Local\airgrid\airgrid.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("airgrid")
        .join("airgrid.db")
}
