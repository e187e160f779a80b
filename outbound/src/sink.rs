//! The [Sink] is the blocking byte-stream destination the worker writes to, typically the write
//! half of a socket. The sender never opens or closes it; it is handed back to the caller through
//! [crate::Termination] once the worker is done with it.
//!
//! Only the worker thread ever calls into a Sink, so implementations need to be [Send] but never
//! [Sync].

use std::io;

/// A [Blackhole] sink which accepts and discards everything, semantic equivalent of `/dev/null`.
///
/// [Blackhole]: blackhole::BlackholeSink
#[path = "sink/blackhole.rs"]
mod blackhole;

/// [log] sink prints every payload through `tracing`.
#[path = "sink/log.rs"]
mod log;

/// Adapter for anything implementing [io::Write].
#[path = "sink/writer.rs"]
mod writer;

pub use blackhole::BlackholeSink;
pub use log::LogSink;
pub use writer::WriteSink;

/// Set of items to be implemented by a destination of the sender.
pub trait Sink: Send + 'static {
    /// Writes the whole payload or fails. A partial write must be reported as an error.
    fn write(&mut self, payload: &[u8]) -> io::Result<()>;

    /// Pushes buffered bytes down to the underlying destination.
    fn flush(&mut self) -> io::Result<()>;
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn write(&mut self, payload: &[u8]) -> io::Result<()> {
        (**self).write(payload)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}
