//! Portfolio repository: the only reader/writer of persisted ledger state.
//!
//! Two keys:
//! - [`PORTFOLIO_KEY`]: the full [`Portfolio`] snapshot, replaced on every save.
//! - [`HISTORY_KEY`]: the cached valuation history, capped at
//!   `history_cap` points with oldest-first eviction.
//!
//! The repository does no locking. Callers serialize `load -> mutate -> save`
//! cycles themselves (see `vtd-runtime`).

use anyhow::{Context, Result};
use tracing::{info, warn};
use vtd_portfolio::{Portfolio, ValuePoint};

use crate::kv::KeyValueStore;

pub const PORTFOLIO_KEY: &str = "virtual_portfolio";
pub const HISTORY_KEY: &str = "virtual_portfolio_value_history";

pub const DEFAULT_STARTING_CASH: f64 = 100_000.0;
pub const DEFAULT_HISTORY_CAP: usize = 100;

/// Drop the oldest points until at most `cap` remain.
pub fn cap_history(points: &mut Vec<ValuePoint>, cap: usize) {
    if points.len() > cap {
        let excess = points.len() - cap;
        points.drain(..excess);
    }
}

#[derive(Debug, Clone)]
pub struct PortfolioRepository<S> {
    store: S,
    starting_cash: f64,
    history_cap: usize,
}

impl<S: KeyValueStore> PortfolioRepository<S> {
    pub fn new(store: S, starting_cash: f64, history_cap: usize) -> Self {
        Self {
            store,
            starting_cash,
            history_cap: history_cap.max(1),
        }
    }

    pub fn with_defaults(store: S) -> Self {
        Self::new(store, DEFAULT_STARTING_CASH, DEFAULT_HISTORY_CAP)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn starting_cash(&self) -> f64 {
        self.starting_cash
    }

    pub fn history_cap(&self) -> usize {
        self.history_cap
    }

    // -----------------------------------------------------------------------
    // Portfolio
    // -----------------------------------------------------------------------

    /// Load the persisted portfolio, creating and persisting a fresh one with
    /// the configured starting cash on first access.
    ///
    /// A stored document that fails to decode is an error; it is never
    /// replaced silently.
    pub fn load(&self) -> Result<Portfolio> {
        match self.store.get(PORTFOLIO_KEY)? {
            Some(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("persisted {PORTFOLIO_KEY} is not a valid portfolio")),
            None => {
                let pf = Portfolio::new(self.starting_cash);
                self.save(&pf)?;
                info!(starting_cash = self.starting_cash, "initialized virtual portfolio");
                Ok(pf)
            }
        }
    }

    /// Persist the full snapshot, replacing prior state.
    pub fn save(&self, pf: &Portfolio) -> Result<()> {
        let raw = serde_json::to_string(pf).context("portfolio json encode failed")?;
        self.store.set(PORTFOLIO_KEY, &raw)
    }

    /// Delete the portfolio and its valuation history.
    ///
    /// History goes first: if the second delete fails, the surviving portfolio
    /// simply has its history rebuilt on next read.
    pub fn reset(&self) -> Result<()> {
        self.store
            .remove_all(&[HISTORY_KEY, PORTFOLIO_KEY])
            .context("portfolio reset failed")?;
        info!("virtual portfolio reset");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Valuation history
    // -----------------------------------------------------------------------

    /// Cached history, or `None` when absent or undecodable.
    pub fn load_history(&self) -> Result<Option<Vec<ValuePoint>>> {
        let Some(raw) = self.store.get(HISTORY_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str::<Vec<ValuePoint>>(&raw) {
            Ok(points) => Ok(Some(points)),
            Err(e) => {
                warn!(error = %e, "discarding undecodable valuation history");
                Ok(None)
            }
        }
    }

    /// Replace the cached history, applying the retention cap.
    pub fn save_history(&self, mut points: Vec<ValuePoint>) -> Result<Vec<ValuePoint>> {
        cap_history(&mut points, self.history_cap);
        let raw = serde_json::to_string(&points).context("history json encode failed")?;
        self.store.set(HISTORY_KEY, &raw)?;
        Ok(points)
    }

    /// Append one point to the cached history (creating it if absent).
    pub fn append_history(&self, point: ValuePoint) -> Result<Vec<ValuePoint>> {
        let mut points = self.load_history()?.unwrap_or_default();
        points.push(point);
        self.save_history(points)
    }
}
