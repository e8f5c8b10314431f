//! Retry policy for a single status query.
//!
//! This absorbs the flakiness of *one* request: a dropped connection, a 502
//! from a load balancer, a response cut off mid-body. Sustained provider
//! outages are a different problem, handled by the poller's consecutive
//! failed-check counter across scheduled polls.
//!
//! Only [`TranslateError::is_transient`] errors are retried. A 401 or 404
//! will not change on the next attempt, so it is returned immediately.
//!
//! ## Backoff
//!
//! | Variant | Wait after failed attempt *n* (base 2 s) |
//! |---------|------------------------------------------|
//! | [`Backoff::Linear`] | `base * n`: 2 s, 4 s, 6 s … |
//! | [`Backoff::Multiplicative`] | `base * 1.5^(n-1)`, capped: 2 s, 3 s, 4.5 s … 10 s |

use crate::config::Backoff;
use crate::error::TranslateError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Bounded retries with backoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included. At least 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(2000),
            backoff: Backoff::Linear,
        }
    }
}

impl RetryPolicy {
    /// Wait before the attempt following failed attempt `attempt` (1-indexed).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match self.backoff {
            Backoff::Linear => self.base_delay.saturating_mul(attempt),
            Backoff::Multiplicative { factor, cap_ms } => {
                let scaled = self.base_delay.as_millis() as f64 * factor.powi(attempt as i32 - 1);
                let capped = scaled.min(cap_ms as f64).max(0.0);
                Duration::from_millis(capped as u64)
            }
        }
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `op` receives the 1-indexed attempt number. The last error is returned
    /// when every attempt fails.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, TranslateError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, TranslateError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{}: succeeded on attempt {}/{}", label, attempt, max_attempts);
                    }
                    return Ok(value);
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        "{}: attempt {}/{} failed ({}), retrying in {}ms",
                        label,
                        attempt,
                        max_attempts,
                        e,
                        delay.as_millis()
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_transient() {
                        warn!("{}: all {} attempts failed: {}", label, max_attempts, e);
                    }
                    return Err(e);
                }
            }
        }
    }
}
