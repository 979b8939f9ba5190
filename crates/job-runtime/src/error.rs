//! Error types for queue operations.

use thiserror::Error;

/// Comprehensive error type for all queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Connection to queue backend failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Provider error ({provider}): {message}")]
    ProviderError { provider: String, message: String },

    #[error("Entry serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl QueueError {
    /// Check if error is transient and should be retried
    ///
    /// Transient failures are surfaced to the sending platform as a failed
    /// acknowledgement so that its own retry mechanism redelivers the
    /// notification later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. } => true,
            Self::ProviderError { .. } => true,
            Self::Serialization(_) => false,
            Self::Validation(_) => false,
        }
    }
}

/// Validation errors for queue-facing value objects
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    Required { field: String },

    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Value out of range for {field}: {message}")]
    OutOfRange { field: String, message: String },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
