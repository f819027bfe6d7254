use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::{Holding, Portfolio};
use crate::MarkMap;

/// Mark for a holding: the supplied mark, else its cost basis.
pub fn mark_for(holding: &Holding, marks: &MarkMap) -> f64 {
    marks
        .get(&holding.symbol)
        .copied()
        .filter(|p| p.is_finite() && *p > 0.0)
        .unwrap_or(holding.avg_price)
}

/// Total value = cash + Σ(shares × mark).
pub fn compute_total_value(
    cash: f64,
    holdings: &BTreeMap<String, Holding>,
    marks: &MarkMap,
) -> f64 {
    cash + holdings
        .values()
        .map(|h| h.shares * mark_for(h, marks))
        .sum::<f64>()
}

/// Per-holding valuation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HoldingValuation {
    pub symbol: String,
    pub shares: f64,
    pub avg_price: f64,
    pub current_price: f64,
    pub market_value: f64,
    pub gain_loss: f64,
    pub gain_loss_percent: f64,
    /// Share of total market value (excluding cash), in percent.
    pub allocation_percent: f64,
}

/// Portfolio-level valuation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub cash: f64,
    pub market_value: f64,
    pub total_value: f64,
    pub cost_basis: f64,
    pub total_gain_loss: f64,
    pub total_gain_loss_percent: f64,
    pub holdings: Vec<HoldingValuation>,
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

/// Value every holding against `marks` (cost basis where unmarked).
pub fn summarize(pf: &Portfolio, marks: &MarkMap) -> PortfolioSummary {
    let mut rows: Vec<HoldingValuation> = pf
        .holdings
        .values()
        .map(|h| {
            let current_price = mark_for(h, marks);
            let market_value = h.shares * current_price;
            let cost = h.cost_basis();
            HoldingValuation {
                symbol: h.symbol.clone(),
                shares: h.shares,
                avg_price: h.avg_price,
                current_price,
                market_value,
                gain_loss: market_value - cost,
                gain_loss_percent: percent(market_value - cost, cost),
                allocation_percent: 0.0,
            }
        })
        .collect();

    let market_value: f64 = rows.iter().map(|r| r.market_value).sum();
    let cost_basis: f64 = pf.holdings.values().map(Holding::cost_basis).sum();
    for r in rows.iter_mut() {
        r.allocation_percent = percent(r.market_value, market_value);
    }

    PortfolioSummary {
        cash: pf.cash,
        market_value,
        total_value: pf.cash + market_value,
        cost_basis,
        total_gain_loss: market_value - cost_basis,
        total_gain_loss_percent: percent(market_value - cost_basis, cost_basis),
        holdings: rows,
    }
}
