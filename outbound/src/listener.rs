use crate::Error;

/// Notified once the worker has left its loop, for whatever reason.
///
/// `on_finished` runs on the worker thread after the last write returned, so no write is in
/// flight and none will follow. The listener is consumed by the call, it cannot fire twice.
pub trait CompletionListener: Send + 'static {
    fn on_finished(self);
}

impl<F> CompletionListener for F
where
    F: FnOnce() + Send + 'static,
{
    fn on_finished(self) {
        self()
    }
}

/// Per-instance diagnostic hook. Every method defaults to a no-op.
///
/// `on_enqueued` and `on_stop_requested` run on the producer's thread, the rest on the worker.
pub trait Observer: Send + Sync + 'static {
    fn on_started(&self, _name: &str) {}

    fn on_enqueued(&self, _len: usize) {}

    fn on_written(&self, _len: usize) {}

    fn on_stop_requested(&self) {}

    /// Called right before the [CompletionListener], with the recorded stop cause.
    fn on_finished(&self, _cause: Option<&Error>) {}
}

/// The default [Observer], it observes nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl Observer for NoopObserver {}
