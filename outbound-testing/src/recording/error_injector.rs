//! Error injection controller for testing.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Controller for injecting errors into a [RecordingSink](crate::RecordingSink).
///
/// This allows tests to force write or flush failures at a chosen position and to slow writes
/// down like a socket whose send buffer is full.
#[derive(Debug, Default)]
pub struct ErrorInjector {
    /// Fail the next N writes.
    fail_next_writes: AtomicUsize,
    /// Skip the first N writes before starting to fail.
    skip_writes_before_fail: AtomicUsize,
    /// Fail the next N flushes.
    fail_next_flushes: AtomicUsize,
    /// Artificial write latency in milliseconds.
    write_latency_ms: AtomicU64,
}

impl ErrorInjector {
    /// Create a new error injector with all errors disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next N write operations.
    pub fn fail_writes(&self, count: usize) {
        self.fail_next_writes.store(count, Ordering::Relaxed);
    }

    /// Skip the first `skip` writes, then fail the next `fail` writes.
    /// `skip_writes_then_fail(k - 1, 1)` makes exactly the k-th write fail.
    pub fn skip_writes_then_fail(&self, skip: usize, fail: usize) {
        self.skip_writes_before_fail.store(skip, Ordering::Relaxed);
        self.fail_next_writes.store(fail, Ordering::Relaxed);
    }

    /// Fail the next N flush operations.
    pub fn fail_flushes(&self, count: usize) {
        self.fail_next_flushes.store(count, Ordering::Relaxed);
    }

    /// Set artificial write latency.
    pub fn set_write_latency(&self, ms: u64) {
        self.write_latency_ms.store(ms, Ordering::Relaxed);
    }

    /// Check and decrement the write failure counter.
    /// If skip_writes_before_fail is set, decrements that first and returns false.
    pub(crate) fn should_fail_write(&self) -> bool {
        let skip = self
            .skip_writes_before_fail
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| {
                if c > 0 { Some(c - 1) } else { None }
            })
            .is_ok();
        if skip {
            return false;
        }
        Self::decrement_counter(&self.fail_next_writes)
    }

    /// Check and decrement the flush failure counter.
    pub(crate) fn should_fail_flush(&self) -> bool {
        Self::decrement_counter(&self.fail_next_flushes)
    }

    /// Blocks the calling thread for the configured write latency.
    pub(crate) fn apply_write_latency(&self) {
        let ms = self.write_latency_ms.load(Ordering::Relaxed);
        if ms > 0 {
            std::thread::sleep(Duration::from_millis(ms));
        }
    }

    /// Helper to decrement a counter and return true if it was > 0.
    fn decrement_counter(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| {
                if c > 0 { Some(c - 1) } else { None }
            })
            .is_ok()
    }
}
