//! Queue Configuration Module
//!
//! Provides configuration structures for the event queue, integrating with the
//! application's configuration discovery.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use crate::queue::QueueError;

/// Poll timeout used when a caller asks for a zero timeout
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 100;

/// How often a blocked shutdown wakes up to report that it is still waiting
pub const DEFAULT_SHUTDOWN_POLL_INTERVAL_MS: u64 = 5000;

/// Main queue configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Queue name, also used for the worker thread name
    pub name: String,

    /// Default wait between `next_event` attempts
    pub poll_timeout_ms: u64,

    /// Wake-up period of a blocked `shutdown()`
    pub shutdown_poll_interval_ms: u64,

    /// Maximum events drained into one batch by the in-memory source
    pub batch_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: "event-queue".to_string(),
            poll_timeout_ms: DEFAULT_POLL_TIMEOUT_MS,
            shutdown_poll_interval_ms: DEFAULT_SHUTDOWN_POLL_INTERVAL_MS,
            batch_size: 100,
        }
    }
}

impl QueueConfig {
    /// Create a default configuration with the given queue name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Poll timeout as a duration; zero falls back to the default
    pub fn poll_timeout(&self) -> Duration {
        if self.poll_timeout_ms == 0 {
            Duration::from_millis(DEFAULT_POLL_TIMEOUT_MS)
        } else {
            Duration::from_millis(self.poll_timeout_ms)
        }
    }

    pub fn shutdown_poll_interval(&self) -> Duration {
        Duration::from_millis(self.shutdown_poll_interval_ms)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), QueueError> {
        if self.name.trim().is_empty() {
            return Err(QueueError::InvalidConfiguration(
                "queue name must not be empty".to_string(),
            ));
        }

        if self.shutdown_poll_interval_ms == 0 {
            return Err(QueueError::InvalidConfiguration(
                "shutdown poll interval must be greater than 0".to_string(),
            ));
        }

        if self.batch_size == 0 {
            return Err(QueueError::InvalidConfiguration(
                "batch size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
