//! Error types for batch generation

use std::path::PathBuf;
use thiserror::Error;

/// Batch runner result type
pub type Result<T> = std::result::Result<T, BaselineError>;

/// Errors that abort a batch before any job is dispatched.
///
/// Per-job dispatch failures are never reported through this type; they are
/// captured in [`crate::dispatch::JobOutcome`] instead.
#[derive(Error, Debug)]
pub enum BaselineError {
    /// Bad interval, warm-up, cool-down, worker count or batch layout
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Artifact could not be written or a directory could not be created
    #[error("IO error at {}: {source}", path.display())]
    Io {
        /// Path being written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Simulation policy could not be loaded
    #[error("Policy error: {0}")]
    Policy(String),
}

impl BaselineError {
    /// Create an invalid parameter error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Create a policy error
    pub fn policy(msg: impl Into<String>) -> Self {
        Self::Policy(msg.into())
    }

    /// Wrap an IO error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
