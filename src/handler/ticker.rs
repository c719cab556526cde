use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Upper bound of the random delay added to each period, as a fraction of the base.
pub const JITTER_FRACTION: f64 = 0.2;

/// Returns `base` extended by a random delay in `[0, base * JITTER_FRACTION)`.
pub fn jittered(base: Duration) -> Duration {
    let factor = rand::thread_rng().gen_range(0.0..JITTER_FRACTION);
    base + base.mul_f64(factor)
}

/// Returns a stream that yields a timestamp roughly every `base`, each period jittered
/// independently so that many nodes sampling at the same cadence drift apart.
///
/// The background timer stops when `token` is cancelled or the receiver is dropped.
///
/// # Panics
///
/// Panics if `base` is zero.
pub fn tick_with_jitter(base: Duration, token: CancellationToken) -> mpsc::Receiver<Instant> {
    assert!(!base.is_zero(), "tick base duration must be positive");

    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(jittered(base)) => {}
            }
            if tx.send(Instant::now()).await.is_err() {
                return;
            }
        }
    });
    rx
}
