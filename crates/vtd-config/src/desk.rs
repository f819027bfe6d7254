//! Typed desk configuration.
//!
//! Every field has a default, so an empty document is a valid config.
//! [`DeskConfig::validate`] is the only place ranges are checked.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DeskConfig {
    pub portfolio: PortfolioSection,
    pub refresh: RefreshSection,
    pub synthetic: SyntheticSection,
    pub oracle: OracleSection,
    pub store: StoreSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioSection {
    /// Cash a fresh portfolio starts with.
    pub starting_cash: f64,
    /// Retained value-history points (oldest evicted first).
    pub history_cap: usize,
}

impl Default for PortfolioSection {
    fn default() -> Self {
        Self {
            starting_cash: 100_000.0,
            history_cap: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSection {
    pub interval_secs: u64,
}

impl Default for RefreshSection {
    fn default() -> Self {
        Self { interval_secs: 300 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticSection {
    pub window_days: u32,
    pub seed: String,
}

impl Default for SyntheticSection {
    fn default() -> Self {
        Self {
            window_days: 30,
            seed: "vtd-demo".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSection {
    pub base_url: String,
    /// Name of the env var holding the API key. Never the key itself.
    pub api_key_env: String,
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_ms: u64,
}

impl Default for OracleSection {
    fn default() -> Self {
        Self {
            base_url: "https://finnhub.io/api/v1".to_string(),
            api_key_env: "FINNHUB_API_KEY".to_string(),
            max_attempts: 4,
            base_backoff_ms: 500,
            max_backoff_ms: 30_000,
            timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub dir: PathBuf,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".vtd"),
        }
    }
}

impl DeskConfig {
    pub fn validate(&self) -> Result<()> {
        let cash = self.portfolio.starting_cash;
        if !cash.is_finite() || cash <= 0.0 {
            bail!("CONFIG_INVALID portfolio.starting_cash must be positive and finite, got {cash}");
        }
        if self.portfolio.history_cap == 0 {
            bail!("CONFIG_INVALID portfolio.history_cap must be at least 1");
        }
        if self.refresh.interval_secs == 0 {
            bail!("CONFIG_INVALID refresh.interval_secs must be at least 1");
        }
        if self.synthetic.window_days < 2 {
            bail!(
                "CONFIG_INVALID synthetic.window_days must be at least 2, got {}",
                self.synthetic.window_days
            );
        }
        if self.oracle.max_attempts == 0 {
            bail!("CONFIG_INVALID oracle.max_attempts must be at least 1");
        }
        if self.oracle.max_backoff_ms < self.oracle.base_backoff_ms {
            bail!("CONFIG_INVALID oracle.max_backoff_ms must be >= oracle.base_backoff_ms");
        }
        if self.oracle.api_key_env.trim().is_empty() {
            bail!("CONFIG_INVALID oracle.api_key_env must name an environment variable");
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh.interval_secs)
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_millis(self.oracle.timeout_ms)
    }
}
