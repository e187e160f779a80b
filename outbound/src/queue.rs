//! The hand-off between producers and the single worker.
//!
//! Producers go through the [Inbox], which serializes every enqueue, stop request and terminal
//! transition on one mutex. The worker owns the [Outlet] and is the only one who ever dequeues.
//! Because all pushes into the underlying channel happen under the same lock, the order the
//! worker observes is exactly the lock-acquisition order of the producers.

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::message::Envelope;

/// Lifecycle of the queue as seen by producers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    /// Accepting payloads.
    Open,
    /// The stop marker has been queued, no more payloads are accepted.
    Stopping,
    /// The worker has exited its loop.
    Stopped,
}

/// Why an enqueue was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rejected {
    Closed,
    Interrupted,
}

/// Outcome of waiting on the [Outlet].
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Dequeued {
    Item(Envelope),
    Cancelled,
    /// Every producer handle is gone and nothing is left to read.
    Closed,
}

struct InboxState {
    tx: Option<mpsc::UnboundedSender<Envelope>>,
    phase: Phase,
}

/// Producer side of the queue.
pub(crate) struct Inbox {
    state: Mutex<InboxState>,
}

/// Consumer side of the queue, owned by the worker.
pub(crate) struct Outlet {
    rx: mpsc::UnboundedReceiver<Envelope>,
}

/// Creates an unbounded FIFO queue.
pub(crate) fn queue() -> (Inbox, Outlet) {
    let (tx, rx) = mpsc::unbounded_channel();
    let inbox = Inbox {
        state: Mutex::new(InboxState {
            tx: Some(tx),
            phase: Phase::Open,
        }),
    };
    (inbox, Outlet { rx })
}

impl Inbox {
    /// Links the payload in behind everything enqueued before it. Never blocks on capacity.
    ///
    /// A cancelled `cancel` token is observed once the lock is held, so a producer that was
    /// cancelled before its turn does not get its payload in.
    pub(crate) fn enqueue(
        &self,
        payload: Bytes,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), Rejected> {
        let state = self.state.lock();
        let Some(tx) = state.tx.as_ref().filter(|_| state.phase == Phase::Open) else {
            return Err(Rejected::Closed);
        };
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(Rejected::Interrupted);
        }
        // the receiver only goes away after the worker has exited its loop
        tx.send(Envelope::Payload(payload))
            .map_err(|_| Rejected::Closed)
    }

    /// Queues the stop marker after everything enqueued so far. Returns `false` if a stop was
    /// already requested or the worker is gone, in which case nothing is queued.
    pub(crate) fn push_stop(&self) -> bool {
        let mut state = self.state.lock();
        if state.phase != Phase::Open {
            return false;
        }
        state.phase = Phase::Stopping;
        // dropping the only sender closes the channel right behind the marker
        if let Some(tx) = state.tx.take() {
            let _ = tx.send(Envelope::Stop);
        }
        true
    }

    /// Terminal transition, called by the worker once it left its loop.
    pub(crate) fn close(&self) {
        let mut state = self.state.lock();
        state.phase = Phase::Stopped;
        state.tx = None;
    }

    pub(crate) fn phase(&self) -> Phase {
        self.state.lock().phase
    }
}

impl Outlet {
    /// Suspends until an item is available or `cancel` fires. Cancellation takes precedence over
    /// queued items.
    pub(crate) fn dequeue_blocking(&mut self, cancel: &CancellationToken) -> Dequeued {
        futures::executor::block_on(async {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Dequeued::Cancelled,
                item = self.rx.recv() => match item {
                    Some(envelope) => Dequeued::Item(envelope),
                    None => Dequeued::Closed,
                },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::*;

    fn payload(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    fn drain_payloads(outlet: &mut Outlet, cancel: &CancellationToken) -> Vec<Bytes> {
        let mut out = Vec::new();
        loop {
            match outlet.dequeue_blocking(cancel) {
                Dequeued::Item(Envelope::Payload(p)) => out.push(p),
                Dequeued::Item(Envelope::Stop) | Dequeued::Closed | Dequeued::Cancelled => {
                    return out;
                }
            }
        }
    }

    #[test]
    fn test_fifo_order() {
        let (inbox, mut outlet) = queue();
        let cancel = CancellationToken::new();
        for s in ["a", "b", "", "c"] {
            inbox.enqueue(payload(s), None).unwrap();
        }
        assert!(inbox.push_stop());

        let got = drain_payloads(&mut outlet, &cancel);
        assert_eq!(got, vec![payload("a"), payload("b"), payload(""), payload("c")]);
    }

    #[test]
    fn test_stop_is_idempotent_and_rejects_later_enqueues() {
        let (inbox, mut outlet) = queue();
        let cancel = CancellationToken::new();
        inbox.enqueue(payload("x"), None).unwrap();
        assert!(inbox.push_stop());
        assert!(!inbox.push_stop());
        assert_eq!(inbox.phase(), Phase::Stopping);
        assert_eq!(inbox.enqueue(payload("z"), None), Err(Rejected::Closed));

        assert_eq!(
            outlet.dequeue_blocking(&cancel),
            Dequeued::Item(Envelope::Payload(payload("x")))
        );
        assert_eq!(outlet.dequeue_blocking(&cancel), Dequeued::Item(Envelope::Stop));
        // exactly one marker is ever delivered
        assert_eq!(outlet.dequeue_blocking(&cancel), Dequeued::Closed);
    }

    #[test]
    fn test_close_rejects_enqueue_and_stop() {
        let (inbox, _outlet) = queue();
        inbox.close();
        assert_eq!(inbox.phase(), Phase::Stopped);
        assert_eq!(inbox.enqueue(payload("late"), None), Err(Rejected::Closed));
        assert!(!inbox.push_stop());
    }

    #[test]
    fn test_enqueue_after_outlet_dropped() {
        let (inbox, outlet) = queue();
        drop(outlet);
        assert_eq!(inbox.enqueue(payload("lost"), None), Err(Rejected::Closed));
    }

    #[test]
    fn test_enqueue_with_cancelled_token() {
        let (inbox, mut outlet) = queue();
        let producer_cancel = CancellationToken::new();
        producer_cancel.cancel();
        assert_eq!(
            inbox.enqueue(payload("a"), Some(&producer_cancel)),
            Err(Rejected::Interrupted)
        );
        // the queue itself keeps working
        inbox.enqueue(payload("b"), None).unwrap();
        inbox.push_stop();
        assert_eq!(
            drain_payloads(&mut outlet, &CancellationToken::new()),
            vec![payload("b")]
        );
    }

    #[test]
    fn test_cancel_wins_over_queued_items() {
        let (inbox, mut outlet) = queue();
        inbox.enqueue(payload("a"), None).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(outlet.dequeue_blocking(&cancel), Dequeued::Cancelled);
    }

    #[test]
    fn test_dequeue_wakes_on_enqueue_and_cancel() {
        let (inbox, mut outlet) = queue();
        let inbox = Arc::new(inbox);
        let cancel = CancellationToken::new();

        let producer = {
            let inbox = Arc::clone(&inbox);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                inbox.enqueue(payload("late"), None).unwrap();
            })
        };
        assert_eq!(
            outlet.dequeue_blocking(&cancel),
            Dequeued::Item(Envelope::Payload(payload("late")))
        );
        producer.join().unwrap();

        let canceller = {
            let cancel = cancel.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                cancel.cancel();
            })
        };
        assert_eq!(outlet.dequeue_blocking(&cancel), Dequeued::Cancelled);
        canceller.join().unwrap();
    }

    #[test]
    fn test_concurrent_producers_total_order() {
        const PRODUCERS: usize = 8;
        const PER_PRODUCER: usize = 500;

        let (inbox, mut outlet) = queue();
        let inbox = Arc::new(inbox);
        let handles = (0..PRODUCERS)
            .map(|p| {
                let inbox = Arc::clone(&inbox);
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        inbox.enqueue(payload(&format!("{p}:{i}")), None).unwrap();
                    }
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().unwrap();
        }
        inbox.push_stop();

        let got = drain_payloads(&mut outlet, &CancellationToken::new());
        assert_eq!(got.len(), PRODUCERS * PER_PRODUCER);

        // no loss, no duplication, and each producer's own order is kept
        let mut next_expected: HashMap<usize, usize> = HashMap::new();
        for item in got {
            let text = String::from_utf8(item.to_vec()).unwrap();
            let (p, i) = text.split_once(':').unwrap();
            let (p, i) = (p.parse::<usize>().unwrap(), i.parse::<usize>().unwrap());
            let expected = next_expected.entry(p).or_insert(0);
            assert_eq!(*expected, i, "producer {p} out of order");
            *expected += 1;
        }
        assert!(next_expected.values().all(|n| *n == PER_PRODUCER));
    }
}
