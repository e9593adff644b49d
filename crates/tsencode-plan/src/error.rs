//! Error types for the planning layer.

use std::path::PathBuf;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while deriving a transcode plan.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A schedule document was named on the command line but does not exist.
    #[error("schedule document not found: {}", path.display())]
    ScheduleNotFound { path: PathBuf },

    /// The schedule document is not valid JSON.
    #[error("malformed schedule document: {0}")]
    MalformedSchedule(#[from] serde_json::Error),

    /// Valid JSON, but not an object.
    #[error("schedule document is not a JSON object")]
    ScheduleNotObject,

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new ScheduleNotFound error.
    pub fn schedule_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ScheduleNotFound { path: path.into() }
    }
}
