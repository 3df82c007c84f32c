//! Monitors and Wake-up Signalling
//!
//! A monitor is a lock paired with a condition variable. The event queue keeps
//! three of them apart (run state, wake-up, shutdown state) so producers waking
//! the poller never contend with the start/shutdown protocol.

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::Arc;
use std::time::Duration;
use crate::queue::statistics::QueueCounters;

/// State guarded by a mutex together with the condition variable used to wait on it
#[derive(Debug, Default)]
pub struct Monitor<T> {
    state: Mutex<T>,
    condvar: Condvar,
}

impl<T> Monitor<T> {
    pub fn new(state: T) -> Self {
        Self {
            state: Mutex::new(state),
            condvar: Condvar::new(),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.state.lock()
    }

    /// Wait for a notification or the timeout. Returns true if the wait timed out.
    pub fn wait_for(&self, guard: &mut MutexGuard<'_, T>, timeout: Duration) -> bool {
        self.condvar.wait_for(guard, timeout).timed_out()
    }

    pub fn notify_one(&self) -> bool {
        self.condvar.notify_one()
    }

    pub fn notify_all(&self) -> usize {
        self.condvar.notify_all()
    }
}

/// Wake-up monitor shared by producers and the polling worker.
///
/// A signal raised while nobody is waiting stays pending and is consumed by
/// the next wait, so a notification between a failed fetch and the wait is
/// never lost.
#[derive(Debug, Default)]
pub struct WakeSignal {
    pending: Monitor<bool>,
}

impl WakeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal and wake any waiter
    pub fn signal(&self) {
        let mut pending = self.pending.lock();
        *pending = true;
        self.pending.notify_all();
    }

    /// Block until signalled or until `timeout` elapses.
    ///
    /// Returns true when woken by a signal, false on timeout.
    pub fn wait(&self, timeout: Duration) -> bool {
        let mut pending = self.pending.lock();
        if !*pending {
            self.pending.wait_for(&mut pending, timeout);
        }
        std::mem::replace(&mut *pending, false)
    }

    /// Drop any signal that nobody consumed
    pub fn clear(&self) {
        *self.pending.lock() = false;
    }

    pub fn is_pending(&self) -> bool {
        *self.pending.lock()
    }
}

/// Cheap, clonable handle producers use to wake a queue's poller
#[derive(Debug, Clone)]
pub struct EventNotifier {
    wake: Arc<WakeSignal>,
    counters: Arc<QueueCounters>,
}

impl EventNotifier {
    pub(crate) fn new(wake: Arc<WakeSignal>, counters: Arc<QueueCounters>) -> Self {
        Self { wake, counters }
    }

    /// Wake the polling worker now instead of after its poll timeout
    pub fn notify(&self) {
        self.counters.record_notification();
        self.wake.signal();
    }
}
