//! Bridges a subscribed stream or a timer to a processing function.
//!
//! A [`ChannelHandler`] repeatedly receives items from a channel and hands each one to a
//! [`Handle`] implementation. A failing item is logged and the loop keeps going; only
//! cancellation (or the producer closing the channel) stops it.
use std::fmt::Display;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

mod ticker;

pub use ticker::{JITTER_FRACTION, jittered, tick_with_jitter};

/// Processes one item received by a [`ChannelHandler`].
pub trait Handle<T>: Send {
    type Error: Display;

    fn handle(&mut self, item: T) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Adapts a closure returning a future into a [`Handle`].
#[derive(Debug, Clone)]
pub struct HandlerFn<F>(F);

pub fn handler_fn<F>(f: F) -> HandlerFn<F> {
    HandlerFn(f)
}

impl<T, F, Fut, E> Handle<T> for HandlerFn<F>
where
    F: FnMut(T) -> Fut + Send,
    Fut: Future<Output = Result<(), E>> + Send,
    E: Display,
{
    type Error = E;

    fn handle(&mut self, item: T) -> impl Future<Output = Result<(), Self::Error>> + Send {
        (self.0)(item)
    }
}

/// Drives a [`Handle`] with the items of one channel.
pub struct ChannelHandler<T, H> {
    name: String,
    channel: mpsc::Receiver<T>,
    handler: H,
}

impl<T, H> ChannelHandler<T, H>
where
    T: Send + 'static,
    H: Handle<T> + 'static,
{
    /// `name` only shows up in log records.
    pub fn new(name: impl Into<String>, handler: H, channel: mpsc::Receiver<T>) -> Self {
        Self {
            name: name.into(),
            channel,
            handler,
        }
    }

    /// Runs until `token` is cancelled or the channel is closed.
    pub async fn start(mut self, token: CancellationToken) {
        loop {
            let item = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    log::debug!("handler `{}` cancelled", self.name);
                    return;
                }
                item = self.channel.recv() => item,
            };
            let Some(item) = item else {
                log::debug!("handler `{}` stream closed", self.name);
                return;
            };
            if let Err(err) = self.handler.handle(item).await {
                log::error!("error in handler `{}`: {}", self.name, err);
            }
        }
    }

    /// Spawns [`start`](Self::start) as an independent task.
    pub fn spawn(self, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.start(token))
    }
}
