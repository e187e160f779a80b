//! Outbound is an ordered, non-blocking sender in front of a single blocking byte sink, such as the
//! write path of a socket.
//!
//! Producers on any thread hand payloads to an [OutboundSender] (or a cloned [Producer]); a
//! dedicated worker thread writes them to the [Sink] one at a time, in the order the queue accepted
//! them:
//! - Enqueue never blocks on capacity, the queue is unbounded.
//! - Each payload is written in full and flushed before the next one is taken.
//! - [OutboundSender::request_stop] lets everything enqueued before it go out, then terminates.
//! - A write failure terminates immediately and is kept as the stop cause.
//! - The [CompletionListener] is called exactly once, after the last write, from the worker.
//!
//! ```no_run
//! use std::net::TcpStream;
//!
//! use outbound::{OutboundSender, WriteSink};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let stream = TcpStream::connect("127.0.0.1:9000")?;
//! let sender = OutboundSender::start(
//!     WriteSink::new(stream.try_clone()?),
//!     move || {
//!         let _ = stream.shutdown(std::net::Shutdown::Both);
//!     },
//!     Some("peer-9000"),
//! )?;
//! sender.send("hello\n")?;
//! sender.request_stop();
//! let termination = sender.join()?;
//! assert!(termination.is_clean());
//! # Ok(())
//! # }
//! ```

pub use crate::error::{Error, Result};

mod error;

mod config;
pub use crate::config::{ENV_SENDER_NAME, ENV_SENDER_STACK_SIZE, SenderConfig};

mod listener;
pub use crate::listener::{CompletionListener, NoopObserver, Observer};

mod message;

mod queue;

/// Sink contract and the builtin sinks.
pub mod sink;
pub use crate::sink::{BlackholeSink, LogSink, Sink, WriteSink};

mod worker;
pub use crate::worker::WorkerState;

mod sender;
pub use crate::sender::{OutboundSender, OutboundSenderBuilder, Producer, Termination};

/// Re-exported so callers can build tokens for [Producer::send_cancellable] and
/// [OutboundSenderBuilder::cancellation_token] without depending on `tokio-util` directly.
pub use tokio_util::sync::CancellationToken;
