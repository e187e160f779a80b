//! Recording sink for testing.
//!
//! [RecordingSink] keeps every payload it was asked to write, in order, so tests can compare what
//! the sink observed against what was sent. Clones share the same record, which lets a test keep
//! one clone while the sender owns the other.
//!
//! # Example
//! ```ignore
//! use outbound_testing::RecordingSink;
//!
//! let sink = RecordingSink::new();
//! sink.error_injector().skip_writes_then_fail(2, 1);
//! let sender = OutboundSender::start(sink.clone(), || {}, None)?;
//! ```

/// Error injector for testing.
mod error_injector;

pub use error_injector::ErrorInjector;

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use outbound::Sink;
use parking_lot::RwLock;

/// In-memory sink recording each payload.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    /// Successfully written payloads.
    written: Arc<RwLock<Vec<Bytes>>>,
    /// Number of successful flushes.
    flushes: Arc<AtomicUsize>,
    /// Error injector for testing.
    error_injector: Arc<ErrorInjector>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The injector shared by all clones of this sink.
    pub fn error_injector(&self) -> Arc<ErrorInjector> {
        Arc::clone(&self.error_injector)
    }

    /// Snapshot of the payloads written so far.
    pub fn written(&self) -> Vec<Bytes> {
        self.written.read().clone()
    }

    /// Same as [RecordingSink::written], decoded lossily as UTF-8.
    pub fn written_strings(&self) -> Vec<String> {
        self.written
            .read()
            .iter()
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.written.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.written.read().is_empty()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

impl Sink for RecordingSink {
    fn write(&mut self, payload: &[u8]) -> io::Result<()> {
        self.error_injector.apply_write_latency();

        if self.error_injector.should_fail_write() {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "injected write failure",
            ));
        }

        self.written.write().push(Bytes::copy_from_slice(payload));
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.error_injector.should_fail_flush() {
            return Err(io::Error::other("injected flush failure"));
        }
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_in_order() {
        let sink = RecordingSink::new();
        let mut writer = sink.clone();
        writer.write(b"one").unwrap();
        writer.flush().unwrap();
        writer.write(b"").unwrap();
        writer.flush().unwrap();

        assert_eq!(sink.written_strings(), vec!["one".to_string(), String::new()]);
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.flush_count(), 2);
    }

    #[test]
    fn test_injected_failures() {
        let sink = RecordingSink::new();
        let mut writer = sink.clone();
        sink.error_injector().skip_writes_then_fail(1, 1);
        sink.error_injector().fail_flushes(1);

        writer.write(b"ok").unwrap();
        let err = writer.write(b"bad").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(writer.flush().is_err());
        writer.flush().unwrap();

        assert_eq!(sink.written(), vec![Bytes::from("ok")]);
        assert_eq!(sink.flush_count(), 1);
    }
}
