//! Polling Event Queue
//!
//! This module provides a single-consumer background work queue. A dedicated
//! worker thread polls a handler for batches of queued events and processes
//! them, blocking with a bounded timeout while nothing is queued. Producers on
//! any thread wake the worker early after enqueuing work.
//!
//! # Architecture
//!
//! - **EventQueue**: owns the worker thread and the start/shutdown protocol
//! - **EventHandler**: the hooks supplying and processing batches
//! - **Monitors**: separate locks for run state, wake-ups and shutdown state
//! - **MemoryEventQueue**: ready-made in-memory source feeding a `BatchProcessor`
//!
//! # Usage
//!
//! ```rust
//! use eventq::queue::{BatchProcessor, MemoryEventQueue, QueueConfig};
//!
//! struct Printer;
//!
//! impl BatchProcessor<String> for Printer {
//!     fn process_batch(&self, batch: Vec<String>) -> anyhow::Result<()> {
//!         for event in batch {
//!             println!("{}", event);
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let queue = MemoryEventQueue::new(QueueConfig::named("printer"), Printer).unwrap();
//! queue.start().unwrap();
//! queue.enqueue("page/42 published".to_string());
//! queue.shutdown().unwrap();
//! assert_eq!(queue.pending(), 0);
//! ```

pub mod config;
pub mod error;
pub mod event_queue;
pub mod handler;
pub mod memory_source;
pub mod monitor;
pub mod statistics;

// Re-export main types for convenience
pub use config::QueueConfig;
pub use error::{QueueError, QueueResult};
pub use event_queue::{EventQueue, Poller};
pub use handler::{EventBatch, EventHandler};
pub use memory_source::{BatchProcessor, MemoryEventQueue, MemoryEventSource};
pub use monitor::EventNotifier;
pub use statistics::QueueStatistics;

#[cfg(test)]
mod tests;
