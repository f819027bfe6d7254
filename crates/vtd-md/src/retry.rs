//! Rate-limit retry wrapper.
//!
//! Only [`QuoteError::RateLimited`] is retried. Every other failure returns
//! at once so the fallback ladder can take over without delay.

use std::time::Duration;

use tracing::{debug, warn};

use crate::oracle::{PriceOracle, Quote, QuoteError};

/// Bounded exponential backoff: attempt `n` (0-based) waits `base × 2^n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Always at least 1.
    pub max_attempts: u32,
    pub base_backoff: Duration,
    /// Upper bound on any single wait, including server `Retry-After` hints.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

#[derive(Debug, Clone)]
pub struct RetryingOracle<O> {
    inner: O,
    policy: RetryPolicy,
}

impl<O: PriceOracle> RetryingOracle<O> {
    pub fn new(inner: O, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }
}

#[async_trait::async_trait]
impl<O: PriceOracle> PriceOracle for RetryingOracle<O> {
    fn source_name(&self) -> &'static str {
        self.inner.source_name()
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, QuoteError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match self.inner.get_quote(symbol).await {
                Err(QuoteError::RateLimited { retry_after }) if attempt + 1 < attempts => {
                    let wait = retry_after
                        .unwrap_or_else(|| self.policy.backoff_for(attempt))
                        .min(self.policy.max_backoff);
                    debug!(
                        symbol,
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        "rate limited; backing off"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_rate_limited() {
                        warn!(symbol, attempts, "rate limited; retries exhausted");
                    }
                    return Err(e);
                }
                ok => return ok,
            }
        }
    }
}
