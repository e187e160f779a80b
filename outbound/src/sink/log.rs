use std::io;

use super::Sink;

#[derive(Debug, Default)]
pub struct LogSink {
    written: u64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of payloads logged so far.
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl Sink for LogSink {
    fn write(&mut self, payload: &[u8]) -> io::Result<()> {
        self.written += 1;
        tracing::info!(
            seq = self.written,
            len = payload.len(),
            "Payload - {}",
            String::from_utf8_lossy(payload)
        );
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
