use std::collections::BTreeMap;

use crate::types::{Action, Holding, Trade};

/// Share quantities at or below this are treated as flat.
///
/// Float subtraction of fractional lots (0.3 - 0.1 - 0.2) leaves dust; a
/// holding is removed once its remainder falls under this bound.
pub const SHARE_EPSILON: f64 = 1e-9;

/// Shares-weighted average of an existing lot and a new lot.
///
/// `(old_shares × old_avg + new_shares × price) / (old_shares + new_shares)`
pub fn weighted_average(old_shares: f64, old_avg: f64, new_shares: f64, price: f64) -> f64 {
    let total = old_shares + new_shares;
    if total <= 0.0 {
        return price;
    }
    (old_shares * old_avg + new_shares * price) / total
}

/// Apply a buy: cash -= shares × price; open or average into the holding.
pub(crate) fn apply_buy(
    cash: &mut f64,
    holdings: &mut BTreeMap<String, Holding>,
    symbol: &str,
    shares: f64,
    price: f64,
) {
    *cash -= shares * price;
    match holdings.get_mut(symbol) {
        Some(h) => {
            h.avg_price = weighted_average(h.shares, h.avg_price, shares, price);
            h.shares += shares;
        }
        None => {
            holdings.insert(symbol.to_string(), Holding::new(symbol, shares, price));
        }
    }
}

/// Apply a sell: cash += shares × price; reduce the holding, dropping it when flat.
///
/// Selling more than held (possible only when replaying an untrusted log)
/// clamps the holding at zero rather than opening a short.
pub(crate) fn apply_sell(
    cash: &mut f64,
    holdings: &mut BTreeMap<String, Holding>,
    symbol: &str,
    shares: f64,
    price: f64,
) {
    *cash += shares * price;
    let flat = match holdings.get_mut(symbol) {
        Some(h) => {
            h.shares -= shares;
            h.shares <= SHARE_EPSILON
        }
        None => false,
    };
    if flat {
        holdings.remove(symbol);
    }
}

/// Apply one logged trade to a running (cash, holdings) simulation.
///
/// Same bookkeeping as the engine, without funds/shares validation: the log
/// is trusted.
pub fn apply_trade(cash: &mut f64, holdings: &mut BTreeMap<String, Holding>, trade: &Trade) {
    match trade.action {
        Action::Buy => apply_buy(cash, holdings, &trade.symbol, trade.shares, trade.price),
        Action::Sell => apply_sell(cash, holdings, &trade.symbol, trade.shares, trade.price),
    }
}

/// Replay trades in the given order from `starting_cash`, invoking `on_step`
/// after each one with the post-trade cash and holdings.
///
/// Returns the final (cash, holdings).
pub fn replay_trades<'a, I, F>(
    starting_cash: f64,
    trades: I,
    mut on_step: F,
) -> (f64, BTreeMap<String, Holding>)
where
    I: IntoIterator<Item = &'a Trade>,
    F: FnMut(&Trade, f64, &BTreeMap<String, Holding>),
{
    let mut cash = starting_cash;
    let mut holdings: BTreeMap<String, Holding> = BTreeMap::new();
    for trade in trades {
        apply_trade(&mut cash, &mut holdings, trade);
        on_step(trade, cash, &holdings);
    }
    (cash, holdings)
}

/// Recompute (cash, holdings) from a trade log without callbacks.
///
/// Incremental engine execution must match this on the same log.
pub fn recompute_from_history(
    starting_cash: f64,
    trades: &[Trade],
) -> (f64, BTreeMap<String, Holding>) {
    replay_trades(starting_cash, trades, |_, _, _| {})
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn trade(action: Action, symbol: &str, shares: f64, price: f64) -> Trade {
        Trade::new(Utc::now(), action, symbol, shares, price)
    }

    #[test]
    fn weighted_average_two_lots() {
        let avg = weighted_average(10.0, 100.0, 30.0, 120.0);
        assert!((avg - 115.0).abs() < 1e-12);
    }

    #[test]
    fn fractional_dust_is_treated_as_flat() {
        let mut cash = 0.0;
        let mut holdings = BTreeMap::new();
        apply_buy(&mut cash, &mut holdings, "X", 0.3, 1.0);
        apply_sell(&mut cash, &mut holdings, "X", 0.1, 1.0);
        apply_sell(&mut cash, &mut holdings, "X", 0.2, 1.0);
        assert!(holdings.is_empty());
    }

    #[test]
    fn replay_invokes_callback_per_trade() {
        let log = vec![
            trade(Action::Buy, "AAPL", 10.0, 150.0),
            trade(Action::Buy, "MSFT", 2.0, 300.0),
            trade(Action::Sell, "AAPL", 10.0, 160.0),
        ];
        let mut cash_after = Vec::new();
        let (cash, holdings) = replay_trades(100_000.0, &log, |_, c, _| cash_after.push(c));
        assert_eq!(cash_after, vec![98_500.0, 97_900.0, 99_500.0]);
        assert_eq!(cash, 99_500.0);
        assert_eq!(holdings.len(), 1);
        assert!(holdings.contains_key("MSFT"));
    }

    #[test]
    fn replay_of_oversell_does_not_go_short() {
        let log = vec![
            trade(Action::Buy, "AAPL", 1.0, 10.0),
            trade(Action::Sell, "AAPL", 5.0, 10.0),
        ];
        let (_, holdings) = recompute_from_history(100.0, &log);
        assert!(holdings.is_empty());
    }
}
