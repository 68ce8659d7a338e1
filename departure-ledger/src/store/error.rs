//! Snapshot store error types.

use std::path::PathBuf;

/// Errors that can occur when reading or writing the snapshot store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem operation failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File could not be encoded or decoded
    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// File parsed as JSON but does not have the expected layout
    #[error("corrupt store file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        StoreError::Json {
            path: path.into(),
            source,
        }
    }
}

/// Reasons a stored record cannot be standardized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("record is not an array")]
    NotAnArray,

    #[error("unsupported record arity {0}")]
    Arity(usize),

    #[error("label is not a string")]
    Label,

    #[error("unreadable scheduled time")]
    ScheduledTime,

    #[error("cancellation flag is not a boolean")]
    Cancelled,

    #[error("unsupported delay value")]
    Delay,
}
