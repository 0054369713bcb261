//! Exponential backoff with jitter, and an unbounded retry loop built on it.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

/// Delay schedule: `initial * multiplier^(attempt - 1)`, capped at `max`,
/// plus up to `jitter_percent`% random extra.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    pub initial: Duration,
    pub multiplier: u32,
    pub max: Duration,
    pub jitter_percent: u32,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            multiplier: 2,
            max: Duration::from_secs(30),
            jitter_percent: 10,
        }
    }
}

impl ExponentialBackoff {
    /// Delay before retry number `attempt` (1-based). Attempt 0 waits nothing.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = self.multiplier.saturating_pow(attempt - 1);
        let capped = self.initial.saturating_mul(factor).min(self.max);

        let jitter_ceiling = capped * self.jitter_percent / 100;
        if jitter_ceiling.is_zero() {
            return capped;
        }
        let jitter = rand::rng().random_range(Duration::ZERO..=jitter_ceiling);
        capped + jitter
    }
}

/// Runs `op` until it succeeds, sleeping according to `backoff` between
/// attempts. There is no attempt limit; callers bound the total time
/// externally (process supervisor, outer timeout).
pub async fn retry_forever<T, E, F, Fut>(what: &str, backoff: ExponentialBackoff, mut op: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return value,
            Err(e) => {
                attempt = attempt.saturating_add(1);
                let delay = backoff.delay(attempt);
                warn!(%what, attempt, error = %e, retry_in_ms = delay.as_millis(), "attempt failed, retrying");
                tokio::time::sleep(delay).await;
            }
        }
    }
}
