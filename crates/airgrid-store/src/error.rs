//! Error types for airgrid-store.

use std::path::PathBuf;

use rusqlite::ErrorCode;

/// Result type for airgrid-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in airgrid-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[source] rusqlite::Error),

    /// Another connection holds the write lock and the busy timeout elapsed.
    #[error("Database busy: {0}")]
    Busy(String),

    /// A uniqueness, foreign key or check constraint rejected the write.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A row that should exist after a write could not be read back.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
}

impl Error {
    /// Returns true if retrying the operation later may succeed.
    pub fn is_busy(&self) -> bool {
        matches!(self, Error::Busy(_))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => {
                Error::Busy(err.to_string())
            }
            Some(ErrorCode::ConstraintViolation) => Error::Constraint(err.to_string()),
            _ => Error::Database(err),
        }
    }
}
