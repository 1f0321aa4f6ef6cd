//! Cancellation signal for a running pull
//!
//! Cancellation is observed before each attempt and during the backoff
//! sleep. An attempt already in flight always runs to completion.

use tokio::sync::watch;

#[derive(Debug)]
pub struct TransferControl {
    cancel_tx: watch::Sender<bool>,
    cancel_rx: watch::Receiver<bool>,
}

impl TransferControl {
    pub fn new() -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        Self {
            cancel_tx,
            cancel_rx,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }

    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }

    /// Get a receiver for waiting on cancellation
    pub fn subscribe_cancellation(&self) -> watch::Receiver<bool> {
        self.cancel_rx.clone()
    }
}

impl Default for TransferControl {
    fn default() -> Self {
        Self::new()
    }
}
