//! Error types for airgrid-core.
//!
//! Every workflow failure is a distinct variant so callers can tell them
//! apart without inspecting messages.
//!
//! | Error | Retry? |
//! |-------|--------|
//! | [`Error::StoreUnavailable`] | Yes, retried once by [`crate::StoreHandle`] |
//! | [`Error::ClassificationFailed`] | No, the range table has a gap |
//! | everything else | No, the request or the record state is wrong |

use core::fmt;

use airgrid_types::{ClassifyError, FeedbackState, Region, TransitionError};

use crate::identity::Role;

/// Result type for airgrid-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a feedback could not be assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotAssignableReason {
    /// No feedback with that id.
    NotFound,
    /// Another assignment already took it.
    AlreadyAssigned,
}

impl fmt::Display for NotAssignableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotAssignableReason::NotFound => write!(f, "it does not exist"),
            NotAssignableReason::AlreadyAssigned => write!(f, "it is already assigned"),
        }
    }
}

/// Errors returned by the workflow services.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Invalid measurement: {0}")]
    InvalidMeasurementInput(String),

    #[error("Invalid feedback: {0}")]
    InvalidFeedbackInput(String),

    #[error("Invalid inspector: {0}")]
    InvalidInspectorInput(String),

    /// The record is not in the pre-state of the requested transition.
    #[error("Feedback {feedback_id} cannot move from {from} to {to}")]
    InvalidStateTransition {
        feedback_id: i64,
        from: FeedbackState,
        to: FeedbackState,
    },

    #[error("Feedback {feedback_id} cannot be assigned: {reason}")]
    FeedbackNotAssignable {
        feedback_id: i64,
        reason: NotAssignableReason,
    },

    #[error("Feedback {0} not found")]
    FeedbackNotFound(i64),

    #[error("Inspector {0} not found")]
    InspectorNotFound(i64),

    /// The inspector does not exist or is not working.
    #[error("Inspector {0} is not available for assignment")]
    InspectorUnavailable(i64),

    #[error("Feedback {feedback_id} is assigned to {}, not inspector {caller}", assignee(.assigned))]
    InspectorMismatch {
        feedback_id: i64,
        assigned: Option<i64>,
        caller: i64,
    },

    #[error("Inspector {inspector_id} covers {inspector_region}, feedback {feedback_id} is in {feedback_region}")]
    RegionMismatch {
        feedback_id: i64,
        inspector_id: i64,
        feedback_region: Region,
        inspector_region: Region,
    },

    /// A reading fell outside every configured range.
    #[error("Classification failed: {0}")]
    ClassificationFailed(#[from] ClassifyError),

    /// The store could not be reached in time. Retryable.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A uniqueness or reference constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Operation requires the {required} role, caller is {actual}")]
    Forbidden { required: Role, actual: Role },

    #[error("Store error: {0}")]
    Store(#[source] airgrid_store::Error),
}

fn assignee(assigned: &Option<i64>) -> String {
    match assigned {
        Some(id) => format!("inspector {id}"),
        None => "nobody".to_string(),
    }
}

impl Error {
    pub(crate) fn transition(feedback_id: i64, err: TransitionError) -> Self {
        Error::InvalidStateTransition {
            feedback_id,
            from: err.from,
            to: err.to,
        }
    }

    /// Returns true if the operation may succeed when repeated.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::StoreUnavailable(_))
    }
}

impl From<airgrid_store::Error> for Error {
    fn from(err: airgrid_store::Error) -> Self {
        match err {
            airgrid_store::Error::Busy(msg) => Error::StoreUnavailable(msg),
            airgrid_store::Error::Constraint(msg) => Error::Conflict(msg),
            other => Error::Store(other),
        }
    }
}
