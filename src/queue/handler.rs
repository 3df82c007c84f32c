//! Event Handler Hooks
//!
//! The queue owns the worker thread and the start/shutdown protocol; what the
//! events are and how they are processed is supplied by an [`EventHandler`].

use crate::queue::event_queue::Poller;

/// An opaque unit of work: an implementation-specific queue identity and the
/// number of events it carries. The event queue never looks inside `queue`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBatch<Q> {
    pub queue: Q,
    pub count: usize,
}

impl<Q> EventBatch<Q> {
    pub fn new(queue: Q, count: usize) -> Self {
        Self { queue, count }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn into_inner(self) -> Q {
        self.queue
    }
}

/// Hooks invoked by an [`EventQueue`](crate::queue::EventQueue).
///
/// `next_event` and `do_run` are called on the worker thread only; `pre_start`
/// and `pre_shutdown` run on the thread calling `start()` or `shutdown()`.
pub trait EventHandler: Send + Sync + Sized + 'static {
    /// Queue identity carried by each batch
    type Queue: Send;

    /// Called before the worker thread is spawned. An error aborts the start.
    fn pre_start(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Fetch the next batch without blocking
    fn next_event(&self) -> Option<EventBatch<Self::Queue>>;

    /// Fetch and process one batch, normally via
    /// [`Poller::next_queue_event`]. Return false to stop the worker.
    fn do_run(&self, poller: &Poller<'_, Self>) -> bool;

    /// Called after the worker has finished, before shutdown returns
    fn pre_shutdown(&self) {}
}
