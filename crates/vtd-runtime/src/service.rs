//! Portfolio service: the single writer for one portfolio.
//!
//! Every operation takes the same async mutex for its whole duration,
//! oracle awaits included, so a trade, a refresh, a rebuild and a reset can
//! never interleave their load/mutate/save cycles. A refresh that is still
//! waiting on quotes when `reset` is called finishes first; the reset then
//! wipes what it wrote.
//!
//! The service also keeps an in-memory mark book (symbol -> last usable
//! price). It feeds the `LastKnown` rung of the fallback ladder and is
//! cleared on reset.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use vtd_config::DeskConfig;
use vtd_md::{resolve_prices, PriceOracle, PriceRequest, PriceTier, ResolvedPrice};
use vtd_portfolio::{
    summarize, MarkMap, Portfolio, PortfolioSummary, Trade, TradeRejection, TradeRequest,
    ValuePoint,
};
use vtd_store::{KeyValueStore, PortfolioRepository};
use vtd_valuation::{normalize, HistoryBuilder, ReconstructionMode, SyntheticSeries};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of a trade submission. Rejections are outcomes, not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum TradeOutcome {
    Executed { trade: Trade, cash_after: f64 },
    Rejected(TradeRejection),
}

impl TradeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TradeOutcome::Executed { .. })
    }

    /// Human-readable reason.
    pub fn message(&self) -> String {
        match self {
            TradeOutcome::Executed { trade, cash_after } => format!(
                "{} {} {} @ {:.2}; cash {:.2}",
                trade.action.as_str(),
                trade.shares,
                trade.symbol,
                trade.price,
                cash_after
            ),
            TradeOutcome::Rejected(r) => r.to_string(),
        }
    }

    pub fn rejection(&self) -> Option<&TradeRejection> {
        match self {
            TradeOutcome::Rejected(r) => Some(r),
            TradeOutcome::Executed { .. } => None,
        }
    }
}

/// What one refresh cycle did.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshReport {
    pub point: ValuePoint,
    pub prices: BTreeMap<String, ResolvedPrice>,
    pub history_len: usize,
}

impl RefreshReport {
    /// Symbols that did not get a live quote this cycle.
    pub fn degraded(&self) -> Vec<&str> {
        self.prices
            .values()
            .filter(|p| p.tier != PriceTier::Live)
            .map(|p| p.symbol.as_str())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

struct DeskState<S> {
    repo: PortfolioRepository<S>,
    marks: MarkMap,
}

impl<S> DeskState<S> {
    /// Only live quotes enter the mark book.
    fn remember(&mut self, prices: &BTreeMap<String, ResolvedPrice>) {
        for (sym, p) in prices {
            if p.tier == PriceTier::Live {
                self.marks.insert(sym.clone(), p.price);
            }
        }
    }
}

pub struct PortfolioService<S> {
    state: Mutex<DeskState<S>>,
    oracle: Arc<dyn PriceOracle>,
    builder: HistoryBuilder,
}

impl<S: KeyValueStore> PortfolioService<S> {
    pub fn new(
        repo: PortfolioRepository<S>,
        oracle: Arc<dyn PriceOracle>,
        builder: HistoryBuilder,
    ) -> Self {
        Self {
            state: Mutex::new(DeskState {
                repo,
                marks: MarkMap::new(),
            }),
            oracle,
            builder,
        }
    }

    pub fn from_config(store: S, oracle: Arc<dyn PriceOracle>, config: &DeskConfig) -> Self {
        let repo = PortfolioRepository::new(
            store,
            config.portfolio.starting_cash,
            config.portfolio.history_cap,
        );
        let series =
            SyntheticSeries::new(config.synthetic.window_days, config.synthetic.seed.clone());
        let builder = HistoryBuilder::new(config.portfolio.starting_cash, series);
        Self::new(repo, oracle, builder)
    }

    pub fn oracle_name(&self) -> &'static str {
        self.oracle.source_name()
    }

    /// Current portfolio (created on first access).
    pub async fn portfolio(&self) -> Result<Portfolio> {
        let st = self.state.lock().await;
        st.repo.load()
    }

    /// Snapshot of the mark book.
    pub async fn marks(&self) -> MarkMap {
        self.state.lock().await.marks.clone()
    }

    /// Validate and apply one order at the caller-supplied price, then extend
    /// the value history.
    ///
    /// The history gets one point valued with the execution price for the
    /// traded symbol and last known marks (else cost basis) for the rest.
    /// With no cached history the whole history is rebuilt live instead.
    ///
    /// `Err` means the portfolio itself could not be loaded or saved;
    /// business-rule violations come back as [`TradeOutcome::Rejected`].
    /// Once the portfolio is saved the outcome is `Executed` even if the
    /// history update fails.
    pub async fn execute_trade(
        &self,
        action: &str,
        symbol: &str,
        shares: f64,
        price: f64,
    ) -> Result<TradeOutcome> {
        let req = match TradeRequest::parse(action, symbol, shares, price) {
            Ok(r) => r,
            Err(r) => return Ok(rejected(r)),
        };

        let mut st = self.state.lock().await;
        let mut pf = st.repo.load()?;
        let now = Utc::now();
        let trade = match vtd_portfolio::execute_trade(&mut pf, &req, now) {
            Ok(t) => t,
            Err(r) => return Ok(rejected(r)),
        };
        st.repo.save(&pf)?;
        st.marks.insert(trade.symbol.clone(), trade.price);

        // The trade is committed; history is derived and rebuilt on next read.
        if let Err(e) = self.extend_history(&mut st, &pf, now).await {
            warn!(
                symbol = %trade.symbol,
                error = %e,
                "value history not updated after trade"
            );
        }

        info!(
            action = trade.action.as_str(),
            symbol = %trade.symbol,
            shares = trade.shares,
            price = trade.price,
            cash = pf.cash,
            "trade executed"
        );
        Ok(TradeOutcome::Executed {
            trade,
            cash_after: pf.cash,
        })
    }

    /// Cached value history, rebuilt live from the trade log when absent.
    pub async fn value_history(&self) -> Result<Vec<ValuePoint>> {
        let mut st = self.state.lock().await;
        if let Some(points) = st.repo.load_history()? {
            return Ok(normalize(points));
        }
        let pf = st.repo.load()?;
        self.rebuild_live(&mut st, &pf.history, Utc::now()).await
    }

    /// Discard the cached history and rebuild it.
    pub async fn rebuild_history(&self, mode: ReconstructionMode) -> Result<Vec<ValuePoint>> {
        let mut st = self.state.lock().await;
        let pf = st.repo.load()?;
        let now = Utc::now();
        match mode {
            ReconstructionMode::Live => self.rebuild_live(&mut st, &pf.history, now).await,
            ReconstructionMode::Synthetic => {
                let points = normalize(self.builder.synthetic(&pf.history, now));
                let saved = st.repo.save_history(points)?;
                info!(points = saved.len(), "rebuilt synthetic value history");
                Ok(saved)
            }
        }
    }

    /// Quote every holding through the fallback ladder and update the mark
    /// book. Nothing is persisted.
    pub async fn mark_holdings(&self) -> Result<BTreeMap<String, ResolvedPrice>> {
        let mut st = self.state.lock().await;
        let pf = st.repo.load()?;
        Ok(self.quote_holdings(&mut st, &pf).await)
    }

    /// Re-mark every holding and append one point dated now.
    ///
    /// Quote failures degrade to last known or cost basis for this cycle;
    /// only a store failure is an `Err`.
    pub async fn refresh(&self) -> Result<RefreshReport> {
        let mut st = self.state.lock().await;
        let pf = st.repo.load()?;
        let now = Utc::now();

        let prices = self.quote_holdings(&mut st, &pf).await;
        let marks: MarkMap = prices
            .iter()
            .map(|(sym, p)| (sym.clone(), p.price))
            .collect();
        let point = self.builder.append_point(&pf, &marks, now);

        if st.repo.load_history()?.is_none() {
            self.rebuild_live(&mut st, &pf.history, now).await?;
        }
        let history = st.repo.append_history(point.clone())?;

        debug!(
            value = point.value,
            symbols = prices.len(),
            points = history.len(),
            "portfolio refreshed"
        );
        Ok(RefreshReport {
            point,
            prices,
            history_len: history.len(),
        })
    }

    /// Delete the portfolio and its history; forget all marks.
    pub async fn reset(&self) -> Result<()> {
        let mut st = self.state.lock().await;
        st.repo.reset()?;
        st.marks.clear();
        Ok(())
    }

    /// Valuation against the mark book (cost basis where unmarked).
    pub async fn summary(&self) -> Result<PortfolioSummary> {
        let st = self.state.lock().await;
        let pf = st.repo.load()?;
        Ok(summarize(&pf, &st.marks))
    }

    // -----------------------------------------------------------------------
    // Internals (caller holds the lock)
    // -----------------------------------------------------------------------

    async fn quote_holdings(
        &self,
        st: &mut DeskState<S>,
        pf: &Portfolio,
    ) -> BTreeMap<String, ResolvedPrice> {
        let requests: Vec<PriceRequest> = pf
            .holdings
            .values()
            .map(|h| {
                PriceRequest::new(
                    h.symbol.clone(),
                    st.marks.get(&h.symbol).copied(),
                    h.avg_price,
                )
            })
            .collect();
        let prices = resolve_prices(self.oracle.as_ref(), requests).await;
        st.remember(&prices);
        prices
    }

    async fn extend_history(
        &self,
        st: &mut DeskState<S>,
        pf: &Portfolio,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if st.repo.load_history()?.is_some() {
            let point = self.builder.append_point(pf, &st.marks, now);
            st.repo.append_history(point)?;
        } else {
            self.rebuild_live(st, &pf.history, now).await?;
        }
        Ok(())
    }

    async fn rebuild_live(
        &self,
        st: &mut DeskState<S>,
        trades: &[Trade],
        now: DateTime<Utc>,
    ) -> Result<Vec<ValuePoint>> {
        let rebuilt = self
            .builder
            .rebuild_from_trades(self.oracle.as_ref(), trades, &st.marks, now)
            .await;
        st.remember(&rebuilt.prices);
        st.repo.save_history(normalize(rebuilt.points))
    }
}

fn rejected(r: TradeRejection) -> TradeOutcome {
    info!(code = r.code(), reason = %r, "trade rejected");
    TradeOutcome::Rejected(r)
}
