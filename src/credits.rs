//! Credit balance lookup with a process-wide cache.
//!
//! The balance comes from a webhook answering `{"credits": <number>}`. The
//! last good value is kept for [`CACHE_TTL`] and served, flagged as cached,
//! when the webhook cannot be reached.

use crate::config::Backoff;
use crate::error::TranslateError;
use crate::pipeline::retry::RetryPolicy;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// How long a fetched balance stays valid.
pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Process-wide cache shared by every session.
pub static CREDIT_CACHE: Lazy<CreditBalanceCache> =
    Lazy::new(|| CreditBalanceCache::new(CACHE_TTL));

/// A credit balance and where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditBalance {
    pub credits: i64,
    /// `true` when the webhook failed and the cached value was used.
    pub from_cache: bool,
}

/// Last known balance with an expiry.
#[derive(Debug)]
pub struct CreditBalanceCache {
    ttl: Duration,
    entry: Mutex<Option<(i64, Instant)>>,
}

impl CreditBalanceCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    pub fn store(&self, credits: i64) {
        *self.entry.lock().unwrap_or_else(|e| e.into_inner()) =
            Some((credits, Instant::now() + self.ttl));
    }

    /// The cached balance, unless it has expired.
    pub fn get(&self) -> Option<i64> {
        let entry = *self.entry.lock().unwrap_or_else(|e| e.into_inner());
        entry
            .filter(|(_, expires)| Instant::now() <= *expires)
            .map(|(credits, _)| credits)
    }

    pub fn clear(&self) {
        *self.entry.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

#[derive(Deserialize)]
struct WebhookBody {
    credits: f64,
}

/// Webhook retries: 3 after the first attempt, waiting 1 s, 2 s, 3 s.
pub fn webhook_retry_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 4,
        base_delay: Duration::from_secs(1),
        backoff: Backoff::Linear,
    }
}

/// Fetch the balance through the process-wide cache.
pub async fn fetch_credit_balance(url: &str) -> Result<CreditBalance, TranslateError> {
    fetch_credit_balance_with(&CREDIT_CACHE, url, &webhook_retry_policy(), 15).await
}

/// Fetch the balance from `url`, updating `cache` on success and falling
/// back to it when every attempt fails.
pub async fn fetch_credit_balance_with(
    cache: &CreditBalanceCache,
    url: &str,
    policy: &RetryPolicy,
    timeout_secs: u64,
) -> Result<CreditBalance, TranslateError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| TranslateError::Internal(format!("HTTP client: {e}")))?;

    let fetched = policy
        .run("credit balance", |_| fetch_once(&client, url, timeout_secs))
        .await;

    match fetched {
        Ok(credits) => {
            cache.store(credits);
            info!("Credit balance: {}", credits);
            Ok(CreditBalance {
                credits,
                from_cache: false,
            })
        }
        Err(e) => match cache.get() {
            Some(credits) => {
                warn!("Credit balance refresh failed ({}); using cached {}", e, credits);
                Ok(CreditBalance {
                    credits,
                    from_cache: true,
                })
            }
            None => Err(e),
        },
    }
}

async fn fetch_once(
    client: &reqwest::Client,
    url: &str,
    timeout_secs: u64,
) -> Result<i64, TranslateError> {
    let resp = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/json")
        .header(reqwest::header::CACHE_CONTROL, "no-cache")
        .send()
        .await
        .map_err(|e| TranslateError::from_transport(&e, timeout_secs))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(TranslateError::TransientProvider {
            detail: format!("credits webhook returned HTTP {}", status.as_u16()),
        });
    }
    let body = resp
        .text()
        .await
        .map_err(|e| TranslateError::from_transport(&e, timeout_secs))?;

    let parsed: WebhookBody =
        serde_json::from_str(&body).map_err(|e| TranslateError::TransientProvider {
            detail: format!("malformed credits response: {e}"),
        })?;
    if !parsed.credits.is_finite() {
        return Err(TranslateError::TransientProvider {
            detail: "credits value is not a finite number".into(),
        });
    }
    Ok(parsed.credits.round() as i64)
}
