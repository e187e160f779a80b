use std::io::{self, Write};

use super::Sink;

/// Wraps a blocking [Write] (a `TcpStream`, a file, a pipe) as a [Sink].
///
/// Every payload goes through [Write::write_all], so a short write never surfaces as success.
#[derive(Debug)]
pub struct WriteSink<W> {
    inner: W,
}

impl<W> WriteSink<W>
where
    W: Write + Send + 'static,
{
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Gives the writer back, e.g. to close the connection after the sender terminated.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W> Sink for WriteSink<W>
where
    W: Write + Send + 'static,
{
    fn write(&mut self, payload: &[u8]) -> io::Result<()> {
        self.inner.write_all(payload)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
