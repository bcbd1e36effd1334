//! Stop signal for background tasks such as the metrics publisher.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// One-shot stop signal shared by every clone.
///
/// Tasks hold a receiver from [`subscribe`](Self::subscribe) and leave their
/// loop once it yields. Subscribing after the signal fired still works:
/// check [`is_triggered`](Self::is_triggered) first.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    fired: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Fire the signal. Only the first call notifies subscribers.
    pub fn trigger(&self) {
        if self.fired.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::debug!(tasks = self.tx.receiver_count(), "Stopping background tasks");
        let _ = self.tx.send(());
    }

    pub fn is_triggered(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Receivers still alive, i.e. tasks that have not exited yet.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
