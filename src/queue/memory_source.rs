//! In-Memory Event Source
//!
//! A ready-made [`EventHandler`] backed by a lock-free MPSC queue. Producers
//! push events from any thread; the worker drains them in batches of at most
//! `batch_size` and hands each batch to a [`BatchProcessor`].

use crossbeam_queue::SegQueue;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use crate::queue::config::QueueConfig;
use crate::queue::event_queue::{EventQueue, Poller};
use crate::queue::handler::{EventBatch, EventHandler};
use crate::queue::monitor::EventNotifier;
use crate::queue::statistics::QueueStatistics;
use crate::queue::QueueResult;

/// Processes batches drained from a [`MemoryEventSource`]
pub trait BatchProcessor<T>: Send + Sync + 'static {
    /// Called from the queue's `pre_start` hook
    fn prepare(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn process_batch(&self, batch: Vec<T>) -> anyhow::Result<()>;

    /// Called from the queue's `pre_shutdown` hook, after any remaining events were drained
    fn finish(&self) {}
}

/// Handler that buffers events in memory until the worker drains them
pub struct MemoryEventSource<T, P> {
    events: SegQueue<T>,
    pending: AtomicUsize,
    batch_size: usize,
    processor: P,
    failures: AtomicU64,
    stop_on_error: bool,
    drain_on_shutdown: bool,
}

impl<T: Send + 'static, P: BatchProcessor<T>> MemoryEventSource<T, P> {
    pub fn new(batch_size: usize, processor: P) -> Self {
        Self {
            events: SegQueue::new(),
            pending: AtomicUsize::new(0),
            batch_size: batch_size.max(1),
            processor,
            failures: AtomicU64::new(0),
            stop_on_error: false,
            drain_on_shutdown: true,
        }
    }

    /// Stop the worker the first time the processor fails
    pub fn stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }

    /// Whether events still buffered at shutdown are processed before returning
    pub fn drain_on_shutdown(mut self, drain: bool) -> Self {
        self.drain_on_shutdown = drain;
        self
    }

    pub fn push(&self, event: T) {
        // counted before the push so a concurrent drain never takes it below zero
        self.pending.fetch_add(1, Ordering::AcqRel);
        self.events.push(event);
    }

    /// Number of events waiting to be drained
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Number of batches the processor rejected
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    fn drain_batch(&self) -> Vec<T> {
        let mut batch = Vec::with_capacity(self.batch_size.min(self.pending()));
        while batch.len() < self.batch_size {
            match self.events.pop() {
                Some(event) => batch.push(event),
                None => break,
            }
        }
        self.pending.fetch_sub(batch.len(), Ordering::AcqRel);
        batch
    }

    /// Hand a batch to the processor; false when the worker should stop
    fn process(&self, batch: Vec<T>) -> bool {
        let count = batch.len();
        match self.processor.process_batch(batch) {
            Ok(()) => true,
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!("Batch of {} events failed: {:#}", count, e);
                !self.stop_on_error
            }
        }
    }
}

impl<T: Send + 'static, P: BatchProcessor<T>> EventHandler for MemoryEventSource<T, P> {
    type Queue = Vec<T>;

    fn pre_start(&self) -> anyhow::Result<()> {
        self.processor.prepare()
    }

    fn next_event(&self) -> Option<EventBatch<Vec<T>>> {
        if self.pending() == 0 {
            return None;
        }
        let batch = self.drain_batch();
        if batch.is_empty() {
            None
        } else {
            let count = batch.len();
            Some(EventBatch::new(batch, count))
        }
    }

    fn do_run(&self, poller: &Poller<'_, Self>) -> bool {
        match poller.poll_next() {
            Some(batch) => self.process(batch.into_inner()),
            None => true,
        }
    }

    fn pre_shutdown(&self) {
        if self.drain_on_shutdown {
            let mut drained = 0;
            loop {
                let batch = self.drain_batch();
                if batch.is_empty() {
                    break;
                }
                drained += batch.len();
                if !self.process(batch) {
                    break;
                }
            }
            if drained > 0 {
                info!("Processed {} buffered events during shutdown", drained);
            }
        }

        let abandoned = self.pending();
        if abandoned > 0 {
            warn!("{} buffered events were not processed", abandoned);
        }
        self.processor.finish();
    }
}

/// An [`EventQueue`] over a [`MemoryEventSource`] with a producer-side `enqueue`
pub struct MemoryEventQueue<T: Send + 'static, P: BatchProcessor<T>> {
    queue: EventQueue<MemoryEventSource<T, P>>,
}

impl<T: Send + 'static, P: BatchProcessor<T>> MemoryEventQueue<T, P> {
    pub fn new(config: QueueConfig, processor: P) -> QueueResult<Self> {
        let source = MemoryEventSource::new(config.batch_size, processor);
        Self::with_source(config, source)
    }

    /// Build around a source configured with the builder methods
    pub fn with_source(config: QueueConfig, source: MemoryEventSource<T, P>) -> QueueResult<Self> {
        debug!(
            "Creating in-memory queue '{}' (batch size {})",
            config.name,
            source.batch_size()
        );
        Ok(Self {
            queue: EventQueue::new(config, source)?,
        })
    }

    /// Buffer an event and wake the worker
    pub fn enqueue(&self, event: T) {
        self.queue.handler().push(event);
        self.queue.notify_event_queue();
    }

    /// Buffer several events with a single wake-up
    pub fn enqueue_all<I: IntoIterator<Item = T>>(&self, events: I) {
        let source = self.queue.handler();
        for event in events {
            source.push(event);
        }
        self.queue.notify_event_queue();
    }

    pub fn start(&self) -> QueueResult<()> {
        self.queue.start()
    }

    pub fn shutdown(&self) -> QueueResult<()> {
        self.queue.shutdown()
    }

    pub fn is_running(&self) -> bool {
        self.queue.is_running()
    }

    pub fn pending(&self) -> usize {
        self.queue.handler().pending()
    }

    pub fn failures(&self) -> u64 {
        self.queue.handler().failures()
    }

    pub fn processor(&self) -> &P {
        self.queue.handler().processor()
    }

    pub fn notifier(&self) -> EventNotifier {
        self.queue.notifier()
    }

    pub fn statistics(&self) -> QueueStatistics {
        self.queue.statistics()
    }

    pub fn poll_timeout(&self) -> Duration {
        self.queue.config().poll_timeout()
    }

    pub fn inner(&self) -> &EventQueue<MemoryEventSource<T, P>> {
        &self.queue
    }
}
