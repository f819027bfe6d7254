//! Oracle wiring from configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use vtd_config::{DeskConfig, ResolvedSecrets};
use vtd_md::{FinnhubOracle, PriceOracle, RetryPolicy, RetryingOracle, StaticQuoteOracle};

pub fn retry_policy(config: &DeskConfig) -> RetryPolicy {
    RetryPolicy {
        max_attempts: config.oracle.max_attempts.max(1),
        base_backoff: Duration::from_millis(config.oracle.base_backoff_ms),
        max_backoff: Duration::from_millis(config.oracle.max_backoff_ms),
    }
}

/// Finnhub behind the rate-limit retry wrapper, or a static oracle that
/// knows nothing when `offline` is set or no API key is available. Without
/// live quotes every price falls back to last known or cost basis.
pub fn build_oracle(
    config: &DeskConfig,
    secrets: &ResolvedSecrets,
    offline: bool,
) -> Result<Arc<dyn PriceOracle>> {
    if offline {
        info!("offline: quotes disabled");
        return Ok(Arc::new(StaticQuoteOracle::empty()));
    }
    let Some(key) = secrets.oracle_api_key.clone() else {
        warn!(
            env = %secrets.oracle_api_key_env,
            "no quote api key; prices fall back to last known or cost basis"
        );
        return Ok(Arc::new(StaticQuoteOracle::empty()));
    };

    let http = FinnhubOracle::new_with_base_url(
        key,
        config.oracle.base_url.clone(),
        config.oracle_timeout(),
    )
    .context("quote oracle init failed")?;
    Ok(Arc::new(RetryingOracle::new(http, retry_policy(config))))
}
