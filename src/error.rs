//! Error types for FileVault.

use thiserror::Error;

/// Common error type for FileVault.
#[derive(Error, Debug)]
pub enum VaultError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error (blob read/write failure).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or invalid session token.
    #[error("unauthorized")]
    Unauthorized,

    /// Missing or malformed user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource absent, or present but not visible to the requester.
    #[error("{0}")]
    NotFound(String),

    /// Unrecoverable job input. The queue does not retry these.
    #[error("{0}")]
    JobFatal(String),

    /// Job execution failure that may succeed on redelivery.
    #[error("job error: {0}")]
    Job(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl VaultError {
    /// Whether a job failing with this error should skip redelivery.
    pub fn is_fatal(&self) -> bool {
        matches!(self, VaultError::JobFatal(_))
    }
}

impl From<sqlx::Error> for VaultError {
    fn from(e: sqlx::Error) -> Self {
        VaultError::Database(e.to_string())
    }
}

/// Result type alias for FileVault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
