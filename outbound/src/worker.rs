//! The single consumer of the queue. The worker is the only code that ever touches the [Sink],
//! so writes can never interleave.
//!
//! ```text
//!             dequeue payload
//!             write + flush ok
//!              ┌─────────┐
//!              │         ▼
//!          ┌───┴─────────────┐   stop marker / write failure /   ┌─────────┐
//!  start ─►│     Running     ├──────────────────────────────────►│ Stopped │
//!          └─────────────────┘      cancelled while waiting      └─────────┘
//! ```
//!
//! Whatever the exit reason, the stop cause is recorded first, then producers are refused, then
//! the [Observer](crate::Observer) and finally the [CompletionListener] are told, exactly once.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::{debug, error, info, trace, warn};

use crate::Result;
use crate::error::Error;
use crate::listener::CompletionListener;
use crate::message::Envelope;
use crate::queue::{Dequeued, Outlet};
use crate::sender::Shared;
use crate::sink::Sink;

/// State of the worker. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Running,
    Stopped,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::Running => write!(f, "running"),
            WorkerState::Stopped => write!(f, "stopped"),
        }
    }
}

pub(crate) struct SenderWorker<S, L> {
    sink: S,
    outlet: Outlet,
    listener: L,
    shared: Arc<Shared>,
}

impl<S, L> SenderWorker<S, L>
where
    S: Sink,
    L: CompletionListener,
{
    pub(crate) fn new(sink: S, outlet: Outlet, listener: L, shared: Arc<Shared>) -> Self {
        Self {
            sink,
            outlet,
            listener,
            shared,
        }
    }

    /// Runs the drain loop to completion and hands the sink back.
    pub(crate) fn run(mut self) -> S {
        info!(name = %self.shared.name, "Sender worker started");
        self.shared
            .observe("on_started", |o| o.on_started(&self.shared.name));

        let outcome = self.drain();
        self.finish(outcome)
    }

    /// Returns the failure that ended the loop, `None` for a requested stop.
    fn drain(&mut self) -> Option<Error> {
        loop {
            let envelope = match self.outlet.dequeue_blocking(&self.shared.cancel) {
                Dequeued::Item(envelope) => envelope,
                Dequeued::Cancelled => {
                    warn!(name = %self.shared.name, "Cancellation received, stopping worker");
                    return Some(Error::Interrupted(format!(
                        "{} cancelled while waiting for messages",
                        self.shared.name
                    )));
                }
                Dequeued::Closed => {
                    debug!(name = %self.shared.name, "Queue closed without stop marker");
                    return None;
                }
            };

            let Envelope::Payload(payload) = envelope else {
                debug!(name = %self.shared.name, "Stop marker received");
                return None;
            };

            if let Err(e) = self.write(&payload) {
                // remaining items are abandoned, there is no partial drain after a failure
                return Some(e);
            }
            trace!(name = %self.shared.name, len = payload.len(), "Payload written");
            let len = payload.len();
            self.shared.observe("on_written", |o| o.on_written(len));
        }
    }

    /// Writes and flushes one payload. A panicking sink counts as a failed write.
    fn write(&mut self, payload: &[u8]) -> Result<()> {
        let sink = &mut self.sink;
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            sink.write(payload)?;
            sink.flush()
        }));

        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(Error::Write(format!("{:?}: {e}", e.kind()))),
            Err(panic) => Err(Error::Write(format!(
                "sink panicked: {}",
                panic_message(panic.as_ref())
            ))),
        }
    }

    fn finish(self, outcome: Option<Error>) -> S {
        let SenderWorker {
            sink,
            outlet,
            listener,
            shared,
        } = self;

        if let Some(cause) = outcome {
            shared.record_stop_cause(cause);
        }
        shared.inbox.close();
        drop(outlet);

        let cause = shared.stop_cause();
        match &cause {
            None => info!(name = %shared.name, "Sender worker stopped"),
            Some(e) => error!(name = %shared.name, ?e, "Sender worker stopped on failure"),
        }
        shared.observe("on_finished", |o| o.on_finished(cause.as_ref()));
        listener.on_finished();
        sink
    }
}

/// Best effort extraction of a panic payload, which is a `&str` or a `String` in practice.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else {
        payload
            .downcast_ref::<String>()
            .map(|s| s.as_str())
            .unwrap_or("unknown panic payload")
    }
}
