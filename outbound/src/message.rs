use bytes::Bytes;

/// An item travelling through the queue to the worker.
///
/// The stop marker is its own variant, so it can never be confused with a payload, not even an
/// empty one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Envelope {
    /// Opaque bytes to be written to the sink as-is.
    Payload(Bytes),
    /// No further payloads; the worker terminates when it dequeues this.
    Stop,
}
