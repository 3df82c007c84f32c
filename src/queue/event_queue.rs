//! Single-Consumer Polling Event Queue
//!
//! A dedicated worker thread repeatedly calls the handler's `do_run` hook,
//! which fetches and processes one batch. While nothing is queued the worker
//! blocks on the wake monitor with a bounded timeout; producers call
//! `notify_event_queue` (or an [`EventNotifier`]) to cut that wait short.
//!
//! Three monitors are kept apart:
//!
//! - **run state**: `running` plus the worker handle, held by `start()` and
//!   for the whole of `shutdown()`
//! - **wake**: the only lock producers ever touch
//! - **shutdown state**: the shutdown request and the worker's completion report

use log::{debug, error, info, trace, warn};
use parking_lot::Mutex;
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::queue::config::QueueConfig;
use crate::queue::handler::{EventBatch, EventHandler};
use crate::queue::monitor::{EventNotifier, Monitor, WakeSignal};
use crate::queue::statistics::{QueueCounters, QueueStatistics};
use crate::queue::{QueueError, QueueResult};

#[derive(Debug, Default)]
struct RunState {
    running: bool,
    worker: Option<JoinHandle<()>>,
    refuse_next_spawn: bool,
}

#[derive(Debug, Default)]
struct ShutdownState {
    requested: bool,
    worker_done: bool,
    panic: Option<String>,
}

/// State shared between the owning queue and its worker thread
struct Shared<H> {
    config: QueueConfig,
    handler: H,
    wake: Arc<WakeSignal>,
    shutdown: Monitor<ShutdownState>,
    counters: Arc<QueueCounters>,
    active: AtomicBool,
}

impl<H> Shared<H> {
    fn is_shutting_down(&self) -> bool {
        self.shutdown.lock().requested
    }

    fn name(&self) -> &str {
        &self.config.name
    }
}

/// Worker-side view of the queue handed to [`EventHandler::do_run`]
pub struct Poller<'a, H: EventHandler> {
    shared: &'a Shared<H>,
}

impl<'a, H: EventHandler> Poller<'a, H> {
    /// Poll the handler for the next batch.
    ///
    /// Calls `next_event` and waits on the wake monitor for up to `timeout`
    /// between attempts, until a batch arrives or the queue is shutting down.
    /// A zero timeout uses the configured poll timeout.
    pub fn next_queue_event(&self, timeout: Duration) -> Option<EventBatch<H::Queue>> {
        let timeout = if timeout.is_zero() {
            self.shared.config.poll_timeout()
        } else {
            timeout
        };

        loop {
            if self.shared.is_shutting_down() {
                trace!("Queue '{}' shutting down, abandoning poll", self.shared.name());
                return None;
            }

            if let Some(batch) = self.shared.handler.next_event() {
                trace!("Queue '{}' polled batch of {} events", self.shared.name(), batch.count);
                self.shared.counters.record_batch(batch.count);
                return Some(batch);
            }

            if !self.shared.wake.wait(timeout) {
                self.shared.counters.record_poll_timeout();
            }
        }
    }

    /// Poll using the configured timeout
    pub fn poll_next(&self) -> Option<EventBatch<H::Queue>> {
        self.next_queue_event(Duration::ZERO)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shared.is_shutting_down()
    }

    pub fn queue_name(&self) -> &str {
        self.shared.name()
    }

    pub fn handler(&self) -> &H {
        &self.shared.handler
    }
}

/// Background work queue driven by a single dedicated worker thread
pub struct EventQueue<H: EventHandler> {
    shared: Arc<Shared<H>>,
    run_state: Mutex<RunState>,
}

impl<H: EventHandler> EventQueue<H> {
    /// Create a stopped queue around `handler`
    pub fn new(config: QueueConfig, handler: H) -> QueueResult<Self> {
        config.validate()?;

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                handler,
                wake: Arc::new(WakeSignal::new()),
                shutdown: Monitor::new(ShutdownState::default()),
                counters: Arc::new(QueueCounters::default()),
                active: AtomicBool::new(false),
            }),
            run_state: Mutex::new(RunState::default()),
        })
    }

    /// Create a queue with default settings and the given name
    pub fn with_name(name: impl Into<String>, handler: H) -> QueueResult<Self> {
        Self::new(QueueConfig::named(name), handler)
    }

    /// Start the worker thread.
    ///
    /// Fails with an invalid-state error when the queue is already running or
    /// a shutdown is in progress.
    pub fn start(&self) -> QueueResult<()> {
        let name = self.name().to_string();

        if self.shared.is_shutting_down() {
            return Err(QueueError::invalid_state(name, "queue is shutting down"));
        }

        let mut run = self.run_state.lock();
        if run.running {
            return Err(QueueError::invalid_state(name, "queue is already running"));
        }

        debug!("Running pre-start hook for queue '{}'", name);
        self.shared
            .handler
            .pre_start()
            .map_err(|e| QueueError::start_failed(name.as_str(), format!("{:#}", e)))?;

        {
            let mut state = self.shared.shutdown.lock();
            state.worker_done = false;
            state.panic = None;
        }
        self.shared.wake.clear();

        let handle = match self.spawn_worker(&mut run, &name) {
            Ok(handle) => handle,
            Err(e) => {
                error!("Failed to spawn worker for queue '{}': {}", name, e);
                // undo pre_start so the handler's hooks stay paired
                self.shared.handler.pre_shutdown();
                return Err(QueueError::SpawnFailed {
                    queue: name,
                    message: e.to_string(),
                });
            }
        };

        run.running = true;
        run.worker = Some(handle);
        self.shared.active.store(true, Ordering::Release);
        self.shared.counters.record_start();

        info!("Event queue '{}' started", name);
        Ok(())
    }

    fn spawn_worker(&self, run: &mut RunState, name: &str) -> io::Result<JoinHandle<()>> {
        if std::mem::take(&mut run.refuse_next_spawn) {
            return Err(io::Error::new(io::ErrorKind::Other, "worker spawn refused"));
        }

        let shared = Arc::clone(&self.shared);
        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || worker_loop(shared))
    }

    #[cfg(test)]
    fn refuse_next_spawn(&self) {
        self.run_state.lock().refuse_next_spawn = true;
    }

    /// Stop the worker and wait for it to finish.
    ///
    /// A no-op when the queue is not running. Otherwise blocks until the
    /// worker's current `do_run` iteration completes, then runs the
    /// handler's `pre_shutdown` hook. The queue may be started again afterwards.
    pub fn shutdown(&self) -> QueueResult<()> {
        let mut run = self.run_state.lock();
        if !run.running {
            debug!("Queue '{}' is not running, nothing to shut down", self.name());
            return Ok(());
        }

        info!("Shutting down event queue '{}'", self.name());
        self.shared.shutdown.lock().requested = true;
        self.shared.wake.signal();

        let interval = self.shared.config.shutdown_poll_interval();
        let panic_message = {
            let mut state = self.shared.shutdown.lock();
            while !state.worker_done {
                if self.shared.shutdown.wait_for(&mut state, interval) && !state.worker_done {
                    info!("Still waiting for worker of queue '{}' to finish", self.name());
                }
            }
            state.panic.take()
        };

        if let Some(handle) = run.worker.take() {
            if handle.join().is_err() {
                warn!("Worker thread of queue '{}' terminated abnormally", self.name());
            }
        }

        debug!("Running pre-shutdown hook for queue '{}'", self.name());
        self.shared.handler.pre_shutdown();

        {
            let mut state = self.shared.shutdown.lock();
            state.requested = false;
            state.worker_done = false;
        }
        run.running = false;
        self.shared.active.store(false, Ordering::Release);
        self.shared.counters.record_shutdown();

        info!("Event queue '{}' stopped", self.name());

        match panic_message {
            Some(message) => Err(QueueError::WorkerPanicked {
                queue: self.name().to_string(),
                message,
            }),
            None => Ok(()),
        }
    }

    /// Wake the worker now rather than after its poll timeout
    pub fn notify_event_queue(&self) {
        self.shared.counters.record_notification();
        self.shared.wake.signal();
    }

    /// Handle producers on other threads can use to wake the worker
    pub fn notifier(&self) -> EventNotifier {
        EventNotifier::new(Arc::clone(&self.shared.wake), Arc::clone(&self.shared.counters))
    }

    /// True between a successful `start()` and the end of `shutdown()`
    pub fn is_running(&self) -> bool {
        self.shared.active.load(Ordering::Acquire)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shared.is_shutting_down()
    }

    pub fn name(&self) -> &str {
        self.shared.name()
    }

    pub fn config(&self) -> &QueueConfig {
        &self.shared.config
    }

    pub fn handler(&self) -> &H {
        &self.shared.handler
    }

    pub fn statistics(&self) -> QueueStatistics {
        self.shared.counters.snapshot(self.name(), self.is_running())
    }
}

impl<H: EventHandler> Drop for EventQueue<H> {
    /// Dropping a running queue asks the worker to stop but does not wait for it
    fn drop(&mut self) {
        if self.run_state.get_mut().running {
            debug!("Queue '{}' dropped while running, detaching worker", self.name());
            self.shared.shutdown.lock().requested = true;
            self.shared.wake.signal();
        }
    }
}

fn worker_loop<H: EventHandler>(shared: Arc<Shared<H>>) {
    debug!("Worker for queue '{}' entering run loop", shared.name());

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let poller = Poller { shared: &shared };
        loop {
            if shared.is_shutting_down() {
                debug!("Worker for queue '{}' observed shutdown request", shared.name());
                break;
            }

            shared.counters.record_iteration();
            if !shared.handler.do_run(&poller) {
                debug!("Handler for queue '{}' stopped the run loop", shared.name());
                break;
            }
        }
    }));

    let panic_message = outcome.err().map(|payload| {
        let message = panic_message(payload.as_ref());
        error!("Worker for queue '{}' panicked: {}", shared.name(), message);
        message
    });

    let mut state = shared.shutdown.lock();
    state.worker_done = true;
    state.panic = panic_message;
    shared.shutdown.notify_all();
    debug!("Worker for queue '{}' finished", shared.name());
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
