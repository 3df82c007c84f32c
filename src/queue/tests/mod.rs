//! Test module organization for the event queue


use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::queue::{EventBatch, EventHandler, EventQueue, Poller, QueueConfig};

/// Handler whose behaviour each test scripts through its fields
pub(crate) struct ScriptedHandler {
    items: Mutex<VecDeque<u32>>,
    processed: Mutex<Vec<u32>>,
    poll_timeout: Duration,
    work_delay: Duration,
    stop_after: Option<usize>,
    panic_on: Option<u32>,
    fail_pre_start: AtomicBool,
    busy: AtomicBool,
    pre_start_calls: AtomicUsize,
    pre_shutdown_calls: AtomicUsize,
}

impl ScriptedHandler {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            processed: Mutex::new(Vec::new()),
            poll_timeout: Duration::from_millis(20),
            work_delay: Duration::ZERO,
            stop_after: None,
            panic_on: None,
            fail_pre_start: AtomicBool::new(false),
            busy: AtomicBool::new(false),
            pre_start_calls: AtomicUsize::new(0),
            pre_shutdown_calls: AtomicUsize::new(0),
        }
    }

    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn work_delay(mut self, delay: Duration) -> Self {
        self.work_delay = delay;
        self
    }

    pub fn stop_after(mut self, batches: usize) -> Self {
        self.stop_after = Some(batches);
        self
    }

    pub fn panic_on(mut self, item: u32) -> Self {
        self.panic_on = Some(item);
        self
    }

    pub fn set_fail_pre_start(&self, fail: bool) {
        self.fail_pre_start.store(fail, Ordering::SeqCst);
    }

    pub fn push(&self, item: u32) {
        self.items.lock().push_back(item);
    }

    pub fn processed(&self) -> Vec<u32> {
        self.processed.lock().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn pre_start_calls(&self) -> usize {
        self.pre_start_calls.load(Ordering::SeqCst)
    }

    pub fn pre_shutdown_calls(&self) -> usize {
        self.pre_shutdown_calls.load(Ordering::SeqCst)
    }
}

impl EventHandler for ScriptedHandler {
    type Queue = u32;

    fn pre_start(&self) -> anyhow::Result<()> {
        self.pre_start_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_pre_start.load(Ordering::SeqCst) {
            anyhow::bail!("index store unavailable");
        }
        Ok(())
    }

    fn next_event(&self) -> Option<EventBatch<u32>> {
        self.items.lock().pop_front().map(|item| EventBatch::new(item, 1))
    }

    fn do_run(&self, poller: &Poller<'_, Self>) -> bool {
        let Some(batch) = poller.next_queue_event(self.poll_timeout) else {
            return true;
        };

        self.busy.store(true, Ordering::SeqCst);
        if !self.work_delay.is_zero() {
            thread::sleep(self.work_delay);
        }
        if self.panic_on == Some(batch.queue) {
            self.busy.store(false, Ordering::SeqCst);
            panic!("cannot process item {}", batch.queue);
        }

        let mut processed = self.processed.lock();
        processed.push(batch.queue);
        let done = processed.len();
        drop(processed);
        self.busy.store(false, Ordering::SeqCst);

        match self.stop_after {
            Some(limit) => done < limit,
            None => true,
        }
    }

    fn pre_shutdown(&self) {
        self.pre_shutdown_calls.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) fn scripted_queue(handler: ScriptedHandler) -> EventQueue<ScriptedHandler> {
    let config = QueueConfig {
        name: "scripted".to_string(),
        shutdown_poll_interval_ms: 50,
        ..QueueConfig::default()
    };
    EventQueue::new(config, handler).unwrap()
}

/// Poll `condition` until it holds or `timeout` elapses
pub(crate) fn wait_until<F: Fn() -> bool>(condition: F, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
