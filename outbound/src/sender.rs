//! The [OutboundSender] decouples any number of producer threads from one blocking [Sink].
//!
//! Producers enqueue payloads without ever touching the sink; a dedicated worker thread, started
//! as part of construction, drains the queue in FIFO order and writes each payload fully before
//! flushing and moving on.
//!
//! Shutdown is cooperative: [OutboundSender::request_stop] queues a stop marker behind everything
//! enqueued so far, the worker writes what is ahead of it and then terminates. A write failure or
//! a cancellation terminates it right away instead. Either way the stop cause is recorded, further
//! sends fail with [Error::AlreadyStopped], and the [CompletionListener] is called exactly once.
//!
//! Races between `send` and `request_stop` from unsynchronized threads are decided by the queue
//! lock: whichever call takes it first wins.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::Result;
use crate::config::SenderConfig;
use crate::error::Error;
use crate::listener::{CompletionListener, NoopObserver, Observer};
use crate::queue::{Inbox, Phase, Rejected, queue};
use crate::sink::Sink;
use crate::worker::{SenderWorker, WorkerState, panic_message};

/// State shared between the handles and the worker thread.
pub(crate) struct Shared {
    pub(crate) name: String,
    pub(crate) inbox: Inbox,
    /// Cancels the worker's wait for the next item.
    pub(crate) cancel: CancellationToken,
    observer: Box<dyn Observer>,
    stop_cause: OnceLock<Error>,
}

impl Shared {
    pub(crate) fn new(
        name: impl Into<String>,
        inbox: Inbox,
        cancel: CancellationToken,
        observer: Option<Box<dyn Observer>>,
    ) -> Self {
        Self {
            name: name.into(),
            inbox,
            cancel,
            observer: observer.unwrap_or_else(|| Box::new(NoopObserver)),
            stop_cause: OnceLock::new(),
        }
    }

    /// Records the cause unless one was recorded before; the first cause wins.
    pub(crate) fn record_stop_cause(&self, cause: Error) {
        if let Err(cause) = self.stop_cause.set(cause) {
            debug!(name = %self.name, ?cause, "Stop cause already recorded, keeping the first one");
        }
    }

    /// Runs an observer hook. A panicking observer is logged and otherwise ignored, it must not
    /// take the worker down before the listener ran.
    pub(crate) fn observe(&self, hook: &str, f: impl FnOnce(&dyn Observer)) {
        let observer = self.observer.as_ref();
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| f(observer))) {
            error!(
                name = %self.name,
                hook,
                "Observer panicked - {}",
                panic_message(panic.as_ref())
            );
        }
    }

    pub(crate) fn stop_cause(&self) -> Option<Error> {
        self.stop_cause.get().cloned()
    }

    pub(crate) fn state(&self) -> WorkerState {
        match self.inbox.phase() {
            Phase::Stopped => WorkerState::Stopped,
            Phase::Open | Phase::Stopping => WorkerState::Running,
        }
    }
}

/// What is left once the worker thread has exited.
#[derive(Debug)]
pub struct Termination<S> {
    /// The sink, handed back so the caller can close it.
    pub sink: S,
    /// The first recorded stop cause. `None` after a requested stop, unless a producer was
    /// refused with [Error::EnqueueInterrupted] before it: that cause stays recorded even though
    /// the worker itself drained up to the stop marker.
    pub cause: Option<Error>,
}

impl<S> Termination<S> {
    /// No stop cause was recorded: the worker stopped on request and no producer was
    /// interrupted while enqueuing.
    pub fn is_clean(&self) -> bool {
        self.cause.is_none()
    }
}

/// Cloneable handle to enqueue payloads from any thread.
///
/// Dropping producers has no effect on the worker.
#[derive(Clone)]
pub struct Producer {
    shared: Arc<Shared>,
}

impl Producer {
    /// Enqueues a payload behind everything enqueued before it. Never blocks on capacity.
    ///
    /// Fails with [Error::AlreadyStopped] once a stop was requested or the worker terminated;
    /// a rejected payload never reaches the sink.
    pub fn send(&self, payload: impl Into<Bytes>) -> Result<()> {
        self.enqueue(payload.into(), None)
    }

    /// Like [Producer::send], but gives up with [Error::EnqueueInterrupted] if `cancel` is
    /// cancelled when the call gets its turn. That failure is also recorded as the stop cause,
    /// the worker itself keeps running.
    pub fn send_cancellable(
        &self,
        payload: impl Into<Bytes>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.enqueue(payload.into(), Some(cancel))
    }

    fn enqueue(&self, payload: Bytes, cancel: Option<&CancellationToken>) -> Result<()> {
        let len = payload.len();
        match self.shared.inbox.enqueue(payload, cancel) {
            Ok(()) => {
                trace!(name = %self.shared.name, len, "Payload enqueued");
                self.shared.observe("on_enqueued", |o| o.on_enqueued(len));
                Ok(())
            }
            Err(Rejected::Closed) => Err(Error::AlreadyStopped(self.shared.name.clone())),
            Err(Rejected::Interrupted) => {
                let err = Error::EnqueueInterrupted(format!(
                    "{} producer cancelled while enqueuing",
                    self.shared.name
                ));
                warn!(name = %self.shared.name, "Producer cancelled while enqueuing");
                self.shared.record_stop_cause(err.clone());
                Err(err)
            }
        }
    }

    /// Asks the worker to stop after everything enqueued so far. Only the first call has an
    /// effect, later calls and calls after termination are no-ops.
    pub fn request_stop(&self) {
        if self.shared.inbox.push_stop() {
            info!(name = %self.shared.name, "Stop requested");
            self.shared.observe("on_stop_requested", |o| o.on_stop_requested());
        }
    }

    pub fn state(&self) -> WorkerState {
        self.shared.state()
    }

    pub fn is_stop_requested(&self) -> bool {
        self.shared.inbox.phase() != Phase::Open
    }

    /// The recorded stop cause, if any. Only meaningful once the worker has stopped, with the
    /// exception of an [Error::EnqueueInterrupted] which is recorded right away.
    pub fn stop_cause(&self) -> Option<Error> {
        self.shared.stop_cause()
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }
}

impl fmt::Display for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.shared.name)
    }
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("name", &self.shared.name)
            .field("state", &self.state())
            .field("stop_requested", &self.is_stop_requested())
            .finish()
    }
}

/// Owner handle of a sender: a queue, a worker thread and the sink it writes to.
///
/// Dropping it without [OutboundSender::join] requests a stop and detaches the worker, which then
/// finishes writing what was queued and notifies the listener as usual.
pub struct OutboundSender<S> {
    producer: Producer,
    join: Option<JoinHandle<S>>,
}

impl<S: Sink> OutboundSender<S> {
    /// Starts a sender writing to `sink`. The worker thread is running when this returns.
    pub fn start<L>(sink: S, listener: L, name: Option<&str>) -> Result<Self>
    where
        L: CompletionListener,
    {
        let builder = Self::builder(sink, listener);
        match name {
            Some(name) => builder.name(name).start(),
            None => builder.start(),
        }
    }

    pub fn builder<L>(sink: S, listener: L) -> OutboundSenderBuilder<S, L>
    where
        L: CompletionListener,
    {
        OutboundSenderBuilder::new(sink, listener)
    }

    /// See [Producer::send].
    pub fn send(&self, payload: impl Into<Bytes>) -> Result<()> {
        self.producer.send(payload)
    }

    /// See [Producer::send_cancellable].
    pub fn send_cancellable(
        &self,
        payload: impl Into<Bytes>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.producer.send_cancellable(payload, cancel)
    }

    /// See [Producer::request_stop].
    pub fn request_stop(&self) {
        self.producer.request_stop()
    }

    /// Cancels the worker's wait for the next item; it stops with [Error::Interrupted] as soon as
    /// it is idle or done with the write in flight. An in-flight write is never aborted.
    pub fn interrupt(&self) {
        self.producer.shared.cancel.cancel();
    }

    pub fn state(&self) -> WorkerState {
        self.producer.state()
    }

    pub fn is_stop_requested(&self) -> bool {
        self.producer.is_stop_requested()
    }

    pub fn stop_cause(&self) -> Option<Error> {
        self.producer.stop_cause()
    }

    pub fn name(&self) -> &str {
        self.producer.name()
    }

    /// A handle for other producer threads.
    pub fn producer(&self) -> Producer {
        self.producer.clone()
    }

    /// Whether the worker thread has exited, listener included.
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Waits for the worker thread to exit and returns the sink with the stop cause.
    ///
    /// This does not request a stop; call [OutboundSender::request_stop] first unless the worker
    /// is expected to terminate on its own.
    pub fn join(mut self) -> Result<Termination<S>> {
        let handle = self
            .join
            .take()
            .ok_or_else(|| Error::Worker(format!("{} worker already detached", self.name())))?;

        let sink = handle.join().map_err(|panic| {
            Error::Worker(format!(
                "{} worker panicked: {}",
                self.name(),
                panic_message(panic.as_ref())
            ))
        })?;

        Ok(Termination {
            sink,
            cause: self.stop_cause(),
        })
    }
}

impl<S> Drop for OutboundSender<S> {
    fn drop(&mut self) {
        if self.join.take().is_some() {
            self.producer.request_stop();
        }
    }
}

impl<S> fmt::Display for OutboundSender<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.producer, f)
    }
}

impl<S> fmt::Debug for OutboundSender<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutboundSender")
            .field("producer", &self.producer)
            .field("joined", &self.join.is_none())
            .finish()
    }
}

/// OutboundSenderBuilder is a builder to build and start an [OutboundSender].
pub struct OutboundSenderBuilder<S, L> {
    sink: S,
    listener: L,
    config: SenderConfig,
    observer: Option<Box<dyn Observer>>,
    cancel: Option<CancellationToken>,
}

impl<S, L> OutboundSenderBuilder<S, L>
where
    S: Sink,
    L: CompletionListener,
{
    pub fn new(sink: S, listener: L) -> Self {
        Self {
            sink,
            listener,
            config: SenderConfig::default(),
            observer: None,
            cancel: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn config(mut self, config: SenderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn observer(mut self, observer: impl Observer) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Token to cancel the worker with, e.g. a child of an application-wide shutdown token.
    pub fn cancellation_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Spawns the worker thread and returns the running sender.
    pub fn start(self) -> Result<OutboundSender<S>> {
        self.config.validate()?;

        let (inbox, outlet) = queue();
        let shared = Arc::new(Shared::new(
            self.config.name.clone(),
            inbox,
            self.cancel.unwrap_or_else(CancellationToken::new),
            self.observer,
        ));
        let worker = SenderWorker::new(self.sink, outlet, self.listener, Arc::clone(&shared));

        let mut thread = thread::Builder::new().name(self.config.name.clone());
        if let Some(stack_size) = self.config.stack_size {
            thread = thread.stack_size(stack_size);
        }
        let join = thread.spawn(move || worker.run()).map_err(|e| {
            Error::Spawn(format!(
                "failed to spawn worker thread for {}: {e}",
                self.config.name
            ))
        })?;

        Ok(OutboundSender {
            producer: Producer { shared },
            join: Some(join),
        })
    }
}
