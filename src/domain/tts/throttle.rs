use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Minimum spacing between outbound TTS calls.
///
/// The backend enforces its quota per account, not per caller, so every client in the
/// process shares [`Throttle::global`]. Waiters are serialized through the lock: the
/// second caller only starts measuring once the first has stamped the clock.
#[derive(Debug, Default)]
pub struct Throttle {
    last_call: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> Arc<Throttle> {
        static GLOBAL: OnceLock<Arc<Throttle>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(Throttle::new())).clone()
    }

    /// Wait until `min_interval` has passed since the previous call, then record this one.
    ///
    /// Dropping the future while it sleeps leaves the previous timestamp in place.
    pub async fn acquire(&self, min_interval: Duration) {
        let mut last_call = self.last_call.lock().await;

        if let Some(previous) = *last_call {
            let ready_at = previous + min_interval;
            if ready_at > Instant::now() {
                tracing::debug!(
                    wait_ms = (ready_at - Instant::now()).as_millis() as u64,
                    "Throttling TTS call"
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }

        *last_call = Some(Instant::now());
    }
}
