//! Queue Error Types
//!
//! Defines error types specific to event queue lifecycle operations.

use thiserror::Error;

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors that can occur while starting, running or stopping an event queue
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QueueError {
    /// The requested transition is not allowed from the current state
    #[error("Invalid queue state for '{queue}': {message}")]
    InvalidState { queue: String, message: String },

    /// The handler's pre-start hook refused to start the queue
    #[error("Queue '{queue}' failed to start: {message}")]
    StartFailed { queue: String, message: String },

    /// The worker thread could not be created
    #[error("Failed to spawn worker thread for '{queue}': {message}")]
    SpawnFailed { queue: String, message: String },

    /// A handler hook panicked on the worker thread
    #[error("Worker thread for '{queue}' panicked: {message}")]
    WorkerPanicked { queue: String, message: String },

    /// Configuration values are out of range
    #[error("Invalid queue configuration: {0}")]
    InvalidConfiguration(String),
}

impl QueueError {
    /// Create an invalid state error
    pub fn invalid_state(queue: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidState {
            queue: queue.into(),
            message: message.into(),
        }
    }

    /// Create a start failure error
    pub fn start_failed(queue: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StartFailed {
            queue: queue.into(),
            message: message.into(),
        }
    }

    /// True when the error reports a lifecycle misuse rather than a failure
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }
}
