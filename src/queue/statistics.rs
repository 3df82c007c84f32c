//! Queue Statistics Management
//!
//! Lock-free counters updated by the worker thread and by producers, and the
//! serialisable snapshot reported to callers.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters for one event queue
#[derive(Debug, Default)]
pub struct QueueCounters {
    starts: AtomicU64,
    shutdowns: AtomicU64,
    iterations: AtomicU64,
    batches: AtomicU64,
    events: AtomicU64,
    notifications: AtomicU64,
    poll_timeouts: AtomicU64,
}

impl QueueCounters {
    pub fn record_start(&self) {
        self.starts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_iteration(&self) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one polled batch of `count` events
    pub fn record_batch(&self, count: usize) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.events.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_notification(&self) {
        self.notifications.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_poll_timeout(&self) {
        self.poll_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, queue: &str, running: bool) -> QueueStatistics {
        QueueStatistics {
            queue: queue.to_string(),
            running,
            starts: self.starts.load(Ordering::Relaxed),
            shutdowns: self.shutdowns.load(Ordering::Relaxed),
            iterations: self.iterations.load(Ordering::Relaxed),
            batches: self.batches.load(Ordering::Relaxed),
            events: self.events.load(Ordering::Relaxed),
            notifications: self.notifications.load(Ordering::Relaxed),
            poll_timeouts: self.poll_timeouts.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time statistics for an event queue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueStatistics {
    /// Queue name
    pub queue: String,

    /// Whether the worker was running when the snapshot was taken
    pub running: bool,

    pub starts: u64,
    pub shutdowns: u64,

    /// Number of `do_run` invocations
    pub iterations: u64,

    /// Batches returned by `next_queue_event`
    pub batches: u64,

    /// Sum of the counts of all polled batches
    pub events: u64,

    /// Producer wake-ups
    pub notifications: u64,

    /// Poll waits that ran out their full timeout
    pub poll_timeouts: u64,
}

impl QueueStatistics {
    pub fn average_batch_size(&self) -> f64 {
        if self.batches == 0 {
            0.0
        } else {
            self.events as f64 / self.batches as f64
        }
    }
}
