//! Outbound Testing Utilities.

/// In-memory sink that records every payload, with error injection.
pub mod recording;

/// Listener and observer doubles.
pub mod probe;

pub use probe::{CompletionProbe, CountingObserver, ObservedCounts};
pub use recording::{ErrorInjector, RecordingSink};
