use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use outbound::{CompletionListener, Error, Observer};
use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct ProbeState {
    calls: usize,
    thread_name: Option<String>,
}

/// Hands out completion listeners and lets a test wait for them to fire.
#[derive(Debug, Clone, Default)]
pub struct CompletionProbe {
    inner: Arc<(Mutex<ProbeState>, Condvar)>,
}

impl CompletionProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// A listener bumping this probe. Several listeners from one probe share the count.
    pub fn listener(&self) -> impl CompletionListener {
        let inner = Arc::clone(&self.inner);
        move || {
            let (state, cvar) = &*inner;
            let mut state = state.lock();
            state.calls += 1;
            state.thread_name = std::thread::current().name().map(str::to_string);
            cvar.notify_all();
        }
    }

    pub fn calls(&self) -> usize {
        self.inner.0.lock().calls
    }

    /// Name of the thread the last listener ran on.
    pub fn thread_name(&self) -> Option<String> {
        self.inner.0.lock().thread_name.clone()
    }

    /// Waits until at least one listener fired. Returns `false` on timeout.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let (state, cvar) = &*self.inner;
        let mut state = state.lock();
        while state.calls == 0 {
            if cvar.wait_until(&mut state, deadline).timed_out() {
                return state.calls > 0;
            }
        }
        true
    }
}

/// Snapshot of a [CountingObserver].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedCounts {
    pub started: usize,
    pub enqueued: usize,
    pub written: usize,
    pub written_bytes: usize,
    pub stop_requested: usize,
    pub finished: usize,
}

#[derive(Debug, Default)]
struct Counters {
    started: AtomicUsize,
    enqueued: AtomicUsize,
    written: AtomicUsize,
    written_bytes: AtomicUsize,
    stop_requested: AtomicUsize,
    finished: AtomicUsize,
    last_cause: Mutex<Option<Error>>,
}

/// [Observer] counting every callback. Clones share the counters.
#[derive(Debug, Clone, Default)]
pub struct CountingObserver {
    counters: Arc<Counters>,
}

impl CountingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> ObservedCounts {
        let c = &self.counters;
        ObservedCounts {
            started: c.started.load(Ordering::SeqCst),
            enqueued: c.enqueued.load(Ordering::SeqCst),
            written: c.written.load(Ordering::SeqCst),
            written_bytes: c.written_bytes.load(Ordering::SeqCst),
            stop_requested: c.stop_requested.load(Ordering::SeqCst),
            finished: c.finished.load(Ordering::SeqCst),
        }
    }

    /// Cause passed to the last `on_finished`.
    pub fn last_cause(&self) -> Option<Error> {
        self.counters.last_cause.lock().clone()
    }
}

impl Observer for CountingObserver {
    fn on_started(&self, _name: &str) {
        self.counters.started.fetch_add(1, Ordering::SeqCst);
    }

    fn on_enqueued(&self, _len: usize) {
        self.counters.enqueued.fetch_add(1, Ordering::SeqCst);
    }

    fn on_written(&self, len: usize) {
        self.counters.written.fetch_add(1, Ordering::SeqCst);
        self.counters.written_bytes.fetch_add(len, Ordering::SeqCst);
    }

    fn on_stop_requested(&self) {
        self.counters.stop_requested.fetch_add(1, Ordering::SeqCst);
    }

    fn on_finished(&self, cause: Option<&Error>) {
        *self.counters.last_cause.lock() = cause.cloned();
        self.counters.finished.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_wait() {
        let probe = CompletionProbe::new();
        assert!(!probe.wait(Duration::from_millis(10)));

        let listener = probe.listener();
        let handle = std::thread::Builder::new()
            .name("probe-test".to_string())
            .spawn(move || listener.on_finished())
            .unwrap();
        assert!(probe.wait(Duration::from_secs(5)));
        handle.join().unwrap();
        assert_eq!(probe.calls(), 1);
        assert_eq!(probe.thread_name().as_deref(), Some("probe-test"));
    }

    #[test]
    fn test_counting_observer() {
        let observer = CountingObserver::new();
        let shared = observer.clone();
        observer.on_started("x");
        observer.on_enqueued(3);
        observer.on_written(3);
        observer.on_written(4);
        observer.on_stop_requested();
        observer.on_finished(Some(&Error::Write("boom".to_string())));

        assert_eq!(
            shared.counts(),
            ObservedCounts {
                started: 1,
                enqueued: 1,
                written: 2,
                written_bytes: 7,
                stop_requested: 1,
                finished: 1,
            }
        );
        assert_eq!(shared.last_cause(), Some(Error::Write("boom".to_string())));
    }
}
