use std::io;

use super::Sink;

/// Blackhole is a sink to emulate /dev/null
#[derive(Debug, Default, Clone, Copy)]
pub struct BlackholeSink;

impl Sink for BlackholeSink {
    fn write(&mut self, _payload: &[u8]) -> io::Result<()> {
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
