//! In-memory [`Manager`] used by unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use super::{Condition, LineStream, Manager, NotifyError, SubscriptionError};
use crate::resource::ResourceAddress;

pub(crate) struct FakeManager {
    fail_on: Option<ResourceAddress>,
    feeds: Mutex<HashMap<ResourceAddress, mpsc::Sender<String>>>,
    conditions: mpsc::UnboundedSender<Condition>,
}

impl FakeManager {
    pub(crate) fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Condition>) {
        Self::build(None)
    }

    /// A manager whose subscription to `address` fails.
    pub(crate) fn failing_on(
        address: ResourceAddress,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<Condition>) {
        Self::build(Some(address))
    }

    fn build(
        fail_on: Option<ResourceAddress>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<Condition>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let manager = Self {
            fail_on,
            feeds: Mutex::new(HashMap::new()),
            conditions: tx,
        };
        (Arc::new(manager), rx)
    }

    /// Pushes a line into the stream handed out for `address`.
    ///
    /// Returns `false` if nobody subscribed or the subscriber is gone.
    pub(crate) async fn feed(&self, address: &ResourceAddress, line: &str) -> bool {
        let tx = self.feeds.lock().unwrap().get(address).cloned();
        match tx {
            Some(tx) => tx.send(line.to_owned()).await.is_ok(),
            None => false,
        }
    }

    pub(crate) fn subscribed(&self) -> Vec<ResourceAddress> {
        self.feeds.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait::async_trait]
impl Manager for FakeManager {
    fn subscribe(&self, address: ResourceAddress) -> Result<LineStream, SubscriptionError> {
        if self.fail_on.as_ref() == Some(&address) {
            return Err(SubscriptionError::Unavailable {
                address,
                reason: "mock error".to_owned(),
            });
        }
        let (tx, rx) = mpsc::channel(100);
        self.feeds.lock().unwrap().insert(address, tx);
        Ok(rx)
    }

    async fn notify(&self, condition: Condition) -> Result<(), NotifyError> {
        self.conditions
            .send(condition)
            .map_err(|_| NotifyError::Closed)
    }
}
