use crate::resource::ResourceAddress;

/// Errors raised while establishing a subscription.
#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    #[error("resource `{address}` expects {expected} part(s), but got {actual}")]
    PartCount {
        address: ResourceAddress,
        expected: usize,
        actual: usize,
    },
    #[error("resource `{address}` is unavailable: {reason}")]
    Unavailable {
        address: ResourceAddress,
        reason: String,
    },
}

/// Errors raised while delivering a condition to the manager.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("condition sink is closed")]
    Closed,
}
