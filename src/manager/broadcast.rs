use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Fans the lines of one observer out to every subscriber.
///
/// Delivery never blocks the observer: a subscriber whose buffer is full misses the line.
#[derive(Debug, Clone, Default)]
pub(crate) struct Broadcaster {
    subscribers: Arc<Mutex<Vec<mpsc::Sender<String>>>>,
}

impl Broadcaster {
    pub(crate) fn subscribe(&self, capacity: usize) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(capacity);
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Returns true if no subscriber is left to receive lines.
    pub(crate) fn is_idle(&self) -> bool {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.is_empty()
    }

    /// Sends a line to all live subscribers and returns how many received it.
    pub(crate) fn send(&self, line: &str) -> usize {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| !tx.is_closed());

        let mut delivered = 0;
        for tx in subscribers.iter() {
            match tx.try_send(line.to_owned()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    log::warn!("subscriber buffer full, dropping line");
                }
                Err(TrySendError::Closed(_)) => {}
            }
        }
        delivered
    }
}
