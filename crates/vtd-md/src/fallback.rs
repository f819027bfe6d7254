//! Price fallback ladder.
//!
//! One place decides which price a symbol is valued at:
//!
//! 1. [`PriceTier::Live`]: the oracle's current quote, if it succeeds with a
//!    positive finite price.
//! 2. [`PriceTier::LastKnown`]: the last mark the caller saw for the symbol.
//! 3. [`PriceTier::CostBasis`]: the caller-supplied cost basis.
//!
//! Resolution never fails. [`resolve_prices`] issues every symbol's lookup
//! concurrently and joins them, so one slow symbol does not serialize the
//! others and one failing symbol does not affect the rest.

use std::collections::BTreeMap;
use std::fmt;

use futures_util::future::join_all;
use tracing::warn;

use crate::oracle::PriceOracle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PriceTier {
    Live,
    LastKnown,
    CostBasis,
}

impl PriceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceTier::Live => "live",
            PriceTier::LastKnown => "last_known",
            PriceTier::CostBasis => "cost_basis",
        }
    }
}

impl fmt::Display for PriceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved price and the tier that supplied it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPrice {
    pub symbol: String,
    pub price: f64,
    pub tier: PriceTier,
}

/// Input for one symbol of a batch resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRequest {
    pub symbol: String,
    pub last_known: Option<f64>,
    pub cost_basis: f64,
}

impl PriceRequest {
    pub fn new(symbol: impl Into<String>, last_known: Option<f64>, cost_basis: f64) -> Self {
        Self {
            symbol: symbol.into(),
            last_known,
            cost_basis,
        }
    }
}

fn usable(p: f64) -> bool {
    p.is_finite() && p > 0.0
}

/// Walk the ladder for one symbol.
pub async fn resolve_price<O>(
    oracle: &O,
    symbol: &str,
    last_known: Option<f64>,
    cost_basis: f64,
) -> ResolvedPrice
where
    O: PriceOracle + ?Sized,
{
    let fallback = |reason: String| {
        let (price, tier) = match last_known.filter(|p| usable(*p)) {
            Some(p) => (p, PriceTier::LastKnown),
            None => (cost_basis, PriceTier::CostBasis),
        };
        warn!(
            symbol,
            source = oracle.source_name(),
            tier = tier.as_str(),
            price,
            reason = %reason,
            "quote unavailable; using fallback price"
        );
        ResolvedPrice {
            symbol: symbol.to_string(),
            price,
            tier,
        }
    };

    match oracle.get_quote(symbol).await {
        Ok(q) if usable(q.current_price) => ResolvedPrice {
            symbol: symbol.to_string(),
            price: q.current_price,
            tier: PriceTier::Live,
        },
        Ok(q) => fallback(format!("unusable price {}", q.current_price)),
        Err(e) => fallback(e.to_string()),
    }
}

/// Resolve many symbols concurrently. Keyed by symbol.
pub async fn resolve_prices<O>(
    oracle: &O,
    requests: Vec<PriceRequest>,
) -> BTreeMap<String, ResolvedPrice>
where
    O: PriceOracle + ?Sized,
{
    let lookups = requests
        .iter()
        .map(|r| resolve_price(oracle, &r.symbol, r.last_known, r.cost_basis));
    join_all(lookups)
        .await
        .into_iter()
        .map(|r| (r.symbol.clone(), r))
        .collect()
}
