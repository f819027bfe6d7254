//! vtd-portfolio
//!
//! Virtual-trading ledger model.
//! - Cash + holdings + append-only trade log
//! - Weighted-average cost basis
//! - Buy/sell validation with no partial fills and no shorting
//! - Trade-log replay shared with valuation reconstruction
//! - Mark-to-market totals, gain/loss, allocation
//! - Pure deterministic logic (no IO, no clock reads, no price fetching)

mod accounting;
mod metrics;
mod ordering;
mod types;

pub mod engine;

pub use accounting::{
    apply_trade, recompute_from_history, replay_trades, weighted_average, SHARE_EPSILON,
};
pub use engine::{check, execute_trade, TradeRejection, TradeRequest};
pub use metrics::{
    compute_total_value, mark_for, summarize, HoldingValuation, PortfolioSummary,
};
pub use ordering::{sort_trades_by_date, trade_time, DatedTrade};
pub use types::{format_timestamp, Action, Holding, Portfolio, Trade, ValuePoint};

use std::collections::BTreeMap;

/// Canonical mark map type (symbol -> price).
pub type MarkMap = BTreeMap<String, f64>;

/// Helper to build a MarkMap with minimal boilerplate.
pub fn marks<I, S>(items: I) -> MarkMap
where
    I: IntoIterator<Item = (S, f64)>,
    S: Into<String>,
{
    let mut m = MarkMap::new();
    for (sym, px) in items {
        m.insert(sym.into(), px);
    }
    m
}
