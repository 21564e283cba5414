//! Single-assignment completion signals.
//!
//! A `CompletionSignal` is the writing side of a one-shot promise; a
//! `SignalView` is its read-only, awaitable side. The slot is a watch channel
//! written with `send_if_modified`, so the "is it still empty?" check and the
//! store happen under one lock and only the first settlement wins.

use std::sync::Arc;
use tokio::sync::watch;

use crate::error::{ClientError, SignalError};

/// Outcome stored in a settled signal.
pub type Outcome<T> = Result<T, SignalError>;

type Slot<T> = Option<Outcome<T>>;

/// Writing side of a one-shot promise.
///
/// Clones share the same slot, so several failure paths may race to settle
/// it. Only the first call has an effect; later calls return `false`.
#[derive(Debug)]
pub struct CompletionSignal<T> {
    name: &'static str,
    tx: Arc<watch::Sender<Slot<T>>>,
}

impl<T> Clone for CompletionSignal<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T: Clone> CompletionSignal<T> {
    /// Create an unsettled signal.
    pub fn new(name: &'static str) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            name,
            tx: Arc::new(tx),
        }
    }

    /// Settle with a success value.
    pub fn fulfill(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Settle with a failure.
    pub fn fail(&self, error: impl Into<SignalError>) -> bool {
        self.settle(Err(error.into()))
    }

    /// Settle with the given outcome unless already settled.
    pub fn settle(&self, outcome: Outcome<T>) -> bool {
        let succeeded = outcome.is_ok();
        let mut pending = Some(outcome);
        let stored = self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = pending.take();
            true
        });

        if stored {
            tracing::debug!(signal = self.name, succeeded, "Signal settled");
        } else {
            tracing::trace!(signal = self.name, "Ignoring duplicate settlement");
        }
        stored
    }

    /// Whether an outcome has been stored.
    pub fn is_settled(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Awaitable read-only view of this signal.
    pub fn view(&self) -> SignalView<T> {
        SignalView {
            rx: self.tx.subscribe(),
        }
    }

}

/// Read-only, awaitable side of a completion signal.
#[derive(Debug, Clone)]
pub struct SignalView<T> {
    rx: watch::Receiver<Slot<T>>,
}

impl<T: Clone> SignalView<T> {
    /// Wait until the signal settles and return its outcome.
    ///
    /// Never times out on its own; wrap it in `tokio::time::timeout` when a
    /// deadline is needed. Resolves to `SignalError::Abandoned` if every
    /// writer is dropped while the slot is still empty.
    pub async fn wait(&self) -> Outcome<T> {
        let mut rx = self.rx.clone();
        // Bound to a local so the borrow of `rx` ends before it is dropped.
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(slot) => (*slot).clone().unwrap_or(Err(SignalError::Abandoned)),
            Err(_) => Err(SignalError::Abandoned),
        };
        outcome
    }

    /// Current outcome, if settled.
    pub fn try_get(&self) -> Option<Outcome<T>> {
        (*self.rx.borrow()).clone()
    }

    pub fn is_settled(&self) -> bool {
        self.rx.borrow().is_some()
    }
}

/// The three milestones a harness can wait for.
#[derive(Debug, Clone)]
pub struct Signals {
    /// Transport (and TLS handshake, when secured) is ready.
    pub connected: CompletionSignal<()>,
    /// The scripted part of the run is over.
    pub payload_sent: CompletionSignal<()>,
    /// The configured number of inbound units arrived.
    pub threshold_received: CompletionSignal<()>,
}

impl Signals {
    pub fn new() -> Self {
        Self {
            connected: CompletionSignal::new("connected"),
            payload_sent: CompletionSignal::new("payload_sent"),
            threshold_received: CompletionSignal::new("threshold_received"),
        }
    }

    /// Fail every signal that is still pending.
    pub fn fail_pending(&self, error: ClientError) {
        for signal in [&self.connected, &self.payload_sent, &self.threshold_received] {
            signal.fail(error.clone());
        }
    }
}

impl Default for Signals {
    fn default() -> Self {
        Self::new()
    }
}
