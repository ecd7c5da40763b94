// src/executor/busy.rs

//! Reference-counted busy indicator.

use std::sync::{Arc, Mutex};

use tracing::debug;

/// Two-state "operation in progress" indicator owned by the host shell.
///
/// Implementations must be cheap and must not panic; `set_busy` may be called
/// from whichever worker completes an action.
pub trait ProgressSink: Send + Sync {
    fn set_busy(&self, busy: bool);
}

/// Sink for hosts without an indicator.
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn set_busy(&self, _busy: bool) {}
}

/// Reference-counted wrapper around a [`ProgressSink`].
///
/// The indicator shows when the in-progress count goes 0→1 and hides when it
/// returns to 0. The count and the sink call happen under one lock, so
/// transitions are never reordered between overlapping actions.
pub struct BusyTracker {
    sink: Box<dyn ProgressSink>,
    count: Mutex<usize>,
}

impl BusyTracker {
    pub fn new(sink: Box<dyn ProgressSink>) -> Self {
        Self {
            sink,
            count: Mutex::new(0),
        }
    }

    /// Increment the in-progress count; the returned guard decrements it on
    /// drop, so a show is always paired with exactly one hide.
    pub fn acquire(self: &Arc<Self>) -> BusyGuard {
        let mut count = self.lock();
        *count += 1;
        if *count == 1 {
            debug!("busy indicator on");
            self.sink.set_busy(true);
        }
        BusyGuard {
            tracker: Arc::clone(self),
        }
    }

    /// Number of actions currently holding a guard.
    pub fn active(&self) -> usize {
        *self.lock()
    }

    fn release(&self) {
        let mut count = self.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            debug!("busy indicator off");
            self.sink.set_busy(false);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, usize> {
        self.count.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// RAII guard pairing one show with exactly one hide.
pub struct BusyGuard {
    tracker: Arc<BusyTracker>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.tracker.release();
    }
}
