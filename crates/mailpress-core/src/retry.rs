//! Bounded retry with capped exponential backoff.

use std::time::Duration;

use tracing::debug;

/// Delay policy between retry attempts.
///
/// The delay doubles per attempt, starting at `base` and never
/// exceeding `cap`. [`Backoff::none`] disables delays entirely.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
}

impl Backoff {
    /// Backoff starting at `base` and capped at `cap`.
    #[must_use]
    pub const fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    /// No delay between attempts.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            base: Duration::ZERO,
            cap: Duration::ZERO,
        }
    }

    /// Delay before the retry following failed attempt number
    /// `attempt` (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        if self.base.is_zero() {
            return Duration::ZERO;
        }
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.base.saturating_mul(factor).min(self.cap)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_secs(8))
    }
}

/// Runs `op` up to `attempts` times, sleeping per `backoff` between
/// failures, and returns the first success or the last error.
///
/// # Errors
///
/// Returns the final attempt's error once every attempt has failed.
pub async fn retry<T, E, F, Fut>(attempts: u32, backoff: Backoff, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    debug_assert!(attempts > 0);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                debug!(attempt, error = %e, "attempt failed, retrying");
                let delay = backoff.delay_after(attempt);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            Err(e) => return Err(e),
        }
    }
}
