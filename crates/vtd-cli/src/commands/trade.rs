//! `vtd buy` / `vtd sell`.

use anyhow::{bail, Result};

use vtd_runtime::TradeOutcome;

use super::Desk;

/// Execute one order. A rejection exits non-zero with its code and reason.
pub async fn run_trade(
    desk: &Desk,
    action: &str,
    symbol: &str,
    shares: f64,
    price: Option<f64>,
) -> Result<()> {
    let price = match price {
        Some(p) => p,
        None => quote_price(desk, symbol).await?,
    };

    match desk.service.execute_trade(action, symbol, shares, price).await? {
        out @ TradeOutcome::Executed { .. } => {
            println!("{}", out.message());
            Ok(())
        }
        TradeOutcome::Rejected(r) => bail!("TRADE_REJECTED {}: {}", r.code(), r),
    }
}

/// The engine never prices orders itself; without --price the caller
/// supplies a live quote or gives up.
async fn quote_price(desk: &Desk, symbol: &str) -> Result<f64> {
    match desk.oracle.get_quote(symbol.trim()).await {
        Ok(q) if q.current_price.is_finite() && q.current_price > 0.0 => Ok(q.current_price),
        Ok(q) => bail!("no usable price for {}: got {}; pass --price", q.symbol, q.current_price),
        Err(e) => bail!("no price available for {symbol} ({e}); pass --price"),
    }
}
