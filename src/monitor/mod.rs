//! The contract between monitors and the component that feeds them.
//!
//! A [`Monitor`] subscribes to the [`ResourceAddress`]es it needs through a [`Manager`] and
//! reports [`Condition`]s back through the same manager. The manager owns the real observers
//! (kernel log, journal, tailed files) and the reporting backend.
//!
//! # Key Components
//!
//! - [`Monitor`]: A named unit of detection logic.
//! - [`Manager`]: Subscription and notification endpoint handed to monitors.
//! - [`Condition`]: Immutable health signal, built from the [`reasons`] catalog.
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::resource::ResourceAddress;

mod condition;
mod error;
#[cfg(test)]
pub(crate) mod fake;
pub mod reasons;

pub use condition::{Condition, ConditionBuilder, InvalidSeverity, Severity};
pub use error::{NotifyError, SubscriptionError};

/// A stream of raw text lines from a subscribed resource, in source order.
pub type LineStream = tokio::sync::mpsc::Receiver<String>;

/// Subscription and notification endpoint handed to a monitor at registration.
///
/// Implementations must be safe to call concurrently from many handlers.
#[async_trait::async_trait]
pub trait Manager: Send + Sync {
    /// Returns the stream of lines coming from the given resource.
    ///
    /// # Errors
    ///
    /// Returns a [`SubscriptionError`] if the address cannot be satisfied.
    fn subscribe(&self, address: ResourceAddress) -> Result<LineStream, SubscriptionError>;

    /// Delivers one condition occurrence to the reporting layer.
    async fn notify(&self, condition: Condition) -> Result<(), NotifyError>;
}

/// A named unit of detection logic.
pub trait Monitor: Send + Sync {
    /// Stable, human readable identifier.
    fn name(&self) -> &str;

    /// Conditions the monitor declares it may emit. Only used for static validation.
    fn conditions(&self) -> Vec<Condition>;

    /// Subscribes to every resource the monitor needs and spawns its handlers.
    ///
    /// All subscriptions are established before any handler is spawned: on failure the first
    /// error is returned and nothing is left running. Handlers live until `token` is
    /// cancelled; this method does not wait for them.
    ///
    /// Must be called from within a tokio runtime.
    fn register(
        &self,
        token: CancellationToken,
        manager: Arc<dyn Manager>,
    ) -> Result<(), SubscriptionError>;
}
