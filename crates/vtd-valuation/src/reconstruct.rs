//! Valuation History Builder.
//!
//! Turns a trade log into a value series, one of two ways:
//!
//! - [`HistoryBuilder::rebuild_from_trades`]: replays the date-sorted log and
//!   marks every open position at the symbol's *current* resolved price
//!   after each trade. Prices come from the fallback ladder in one
//!   concurrent fan-out before replay; a symbol whose quote fails is
//!   valued at its last known mark, else at its last trade price.
//! - [`HistoryBuilder::synthetic`]: same replay, but positions are marked
//!   on a per-symbol simulated price path, then the sparse points are
//!   densified to daily resolution. With no trades it yields the demo curve.
//!
//! Neither path validates funds: the log is trusted.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use vtd_md::{resolve_prices, PriceOracle, PriceRequest, ResolvedPrice};
use vtd_portfolio::{
    apply_trade, compute_total_value, replay_trades, sort_trades_by_date, DatedTrade, Holding,
    MarkMap, Portfolio, Trade, ValuePoint,
};

use crate::synthetic::{simulated_price, SyntheticSeries};

/// Price paths stop compounding after this many days.
const MAX_SIMULATED_DAYS: i64 = 36_500;

/// How a history rebuild prices positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconstructionMode {
    /// Current oracle prices through the fallback ladder.
    Live,
    /// Simulated price paths; never touches the oracle.
    Synthetic,
}

impl ReconstructionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconstructionMode::Live => "live",
            ReconstructionMode::Synthetic => "synthetic",
        }
    }
}

/// Result of a live rebuild: the series and the price used for each symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveReconstruction {
    pub points: Vec<ValuePoint>,
    pub prices: BTreeMap<String, ResolvedPrice>,
}

impl LiveReconstruction {
    /// Resolved prices as a mark map.
    pub fn marks(&self) -> MarkMap {
        self.prices
            .iter()
            .map(|(sym, r)| (sym.clone(), r.price))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct HistoryBuilder {
    starting_cash: f64,
    synthetic: SyntheticSeries,
}

impl HistoryBuilder {
    pub fn new(starting_cash: f64, synthetic: SyntheticSeries) -> Self {
        Self {
            starting_cash,
            synthetic,
        }
    }

    pub fn starting_cash(&self) -> f64 {
        self.starting_cash
    }

    pub fn series(&self) -> &SyntheticSeries {
        &self.synthetic
    }

    /// Live reconstruction.
    ///
    /// `last_known` feeds the middle rung of the fallback ladder; pass an
    /// empty map to fall straight back to trade prices.
    pub async fn rebuild_from_trades<O>(
        &self,
        oracle: &O,
        trades: &[Trade],
        last_known: &MarkMap,
        now: DateTime<Utc>,
    ) -> LiveReconstruction
    where
        O: PriceOracle + ?Sized,
    {
        if trades.is_empty() {
            return LiveReconstruction {
                points: vec![ValuePoint::new(now, self.starting_cash)],
                prices: BTreeMap::new(),
            };
        }

        let dated = sort_trades_by_date(trades, now);
        let prices = resolve_prices(oracle, price_requests(&dated, last_known)).await;
        let marks: MarkMap = prices
            .iter()
            .map(|(sym, r)| (sym.clone(), r.price))
            .collect();

        let points = replay_marked(self.starting_cash, &dated, |_, _| marks.clone());
        info!(
            trades = dated.len(),
            symbols = prices.len(),
            points = points.len(),
            "rebuilt value history from trade log"
        );
        LiveReconstruction { points, prices }
    }

    /// Synthetic reconstruction.
    ///
    /// With trades: one key point per trade on simulated prices (each
    /// symbol's path starts at its first trade price on its first trade
    /// day), plus a trailing point at `now` when the last trade is at least
    /// a day old, densified to daily points.
    pub fn synthetic(&self, trades: &[Trade], now: DateTime<Utc>) -> Vec<ValuePoint> {
        if trades.is_empty() {
            debug!(window = self.synthetic.window_days(), "empty ledger; demo series");
            return self.synthetic.demo_series(self.starting_cash, now);
        }

        let dated = sort_trades_by_date(trades, now);
        let mut anchors: BTreeMap<String, (DateTime<Utc>, f64)> = BTreeMap::new();
        for d in &dated {
            anchors
                .entry(d.trade.symbol.clone())
                .or_insert((d.at, d.trade.price));
        }

        let mut keys = replay_marked(self.starting_cash, &dated, |at, holdings| {
            simulated_marks(&anchors, holdings, at)
        });

        let stale = keys
            .last()
            .is_some_and(|last| now - last.date >= Duration::days(1));
        if stale {
            let (cash, holdings) =
                replay_trades(self.starting_cash, dated.iter().map(|d| &d.trade), |_, _, _| {});
            let marks = simulated_marks(&anchors, &holdings, now);
            keys.push(ValuePoint::new(now, compute_total_value(cash, &holdings, &marks)));
        }

        let dense = self.synthetic.densify(&keys);
        debug!(keys = keys.len(), points = dense.len(), "synthetic value history");
        dense
    }

    /// A single point valuing `pf` at `marks` (cost basis where unmarked).
    pub fn append_point(&self, pf: &Portfolio, marks: &MarkMap, now: DateTime<Utc>) -> ValuePoint {
        ValuePoint::new(now, compute_total_value(pf.cash, &pf.holdings, marks))
    }
}

/// One ladder request per distinct symbol; cost basis is the symbol's last
/// trade price in date order.
fn price_requests(dated: &[DatedTrade], last_known: &MarkMap) -> Vec<PriceRequest> {
    let mut last_trade_price: BTreeMap<&str, f64> = BTreeMap::new();
    for d in dated {
        last_trade_price.insert(d.trade.symbol.as_str(), d.trade.price);
    }
    last_trade_price
        .into_iter()
        .map(|(sym, px)| PriceRequest::new(sym, last_known.get(sym).copied(), px))
        .collect()
}

fn simulated_marks(
    anchors: &BTreeMap<String, (DateTime<Utc>, f64)>,
    holdings: &BTreeMap<String, Holding>,
    at: DateTime<Utc>,
) -> MarkMap {
    holdings
        .keys()
        .filter_map(|sym| {
            let (start, price) = anchors.get(sym)?;
            let days = (at.date_naive() - start.date_naive())
                .num_days()
                .clamp(0, MAX_SIMULATED_DAYS);
            Some((sym.clone(), simulated_price(sym, *price, days as u32)))
        })
        .collect()
}

/// Replay `dated` from `starting_cash`, emitting one point per trade dated at
/// the trade, valued with the marks `mark` returns for that instant.
fn replay_marked<F>(starting_cash: f64, dated: &[DatedTrade], mut mark: F) -> Vec<ValuePoint>
where
    F: FnMut(DateTime<Utc>, &BTreeMap<String, Holding>) -> MarkMap,
{
    let mut cash = starting_cash;
    let mut holdings = BTreeMap::new();
    dated
        .iter()
        .map(|d| {
            apply_trade(&mut cash, &mut holdings, &d.trade);
            let marks = mark(d.at, &holdings);
            ValuePoint::new(d.at, compute_total_value(cash, &holdings, &marks))
        })
        .collect()
}
