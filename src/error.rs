//! Error types for unscan library.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for unscan operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while processing a document.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The uploaded file is not a PDF, PNG or JPEG.
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    /// A storage key does not exist.
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Storage access failed for a reason other than a missing key.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A remote service call failed.
    #[error("Service error: {0}")]
    Service(String),

    /// A remote service answered with a non-success HTTP status.
    #[error("Service returned HTTP {status}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// The analysis job finished in a failed state.
    #[error("Analysis job {job_id} failed: {reason}")]
    JobFailed {
        /// Service job id
        job_id: String,
        /// Status message reported by the service
        reason: String,
    },

    /// Waiting for a remote operation exceeded its time budget.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The operation was cancelled by the caller.
    #[error("Operation cancelled")]
    Cancelled,

    /// The model call failed or returned no text.
    #[error("Model error: {0}")]
    Model(String),

    /// A response did not have the expected shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Question asked before a document context was stored.
    #[error("No document context at {0}; process the document first")]
    MissingContext(String),

    /// A caller-supplied argument was rejected.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Required configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Check if this error means a key or context was absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::MissingContext(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedResponse(err.to_string())
    }
}

#[cfg(feature = "remote")]
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Error::MalformedResponse(err.to_string());
        }
        match err.status() {
            Some(status) => Error::Http {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => Error::Service(err.to_string()),
        }
    }
}
