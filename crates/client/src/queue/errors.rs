//! Queue error types

use thiserror::Error;

/// Errors from queue storage and replay plumbing
///
/// Failures of the replayed actions themselves are classified `AppError`s
/// and stay with their items; `QueueError` covers the queue's own
/// machinery.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Durable store I/O failure
    #[error("queue storage error during '{operation}': {message}")]
    Storage { operation: String, message: String },

    /// No handler registered for a record's target
    #[error("no handler registered for target '{0}'")]
    HandlerMissing(String),

    /// Corrupt or incompatible persisted data
    #[error("queue serialization error: {0}")]
    Serialization(String),
}

impl QueueError {
    pub fn storage(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage { operation: operation.into(), message: message.into() }
    }
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for QueueError {
    fn from(err: std::io::Error) -> Self {
        Self::storage("io", err.to_string())
    }
}
