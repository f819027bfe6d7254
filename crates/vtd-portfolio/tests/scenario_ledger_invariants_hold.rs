//! Scenario: ledger invariants across long trade sequences
//!
//! # Invariants under test
//!
//! 1. For every sequence of accepted trades, cash never goes negative and no
//!    holding ever carries non-positive shares.
//! 2. Cash equals starting cash minus all buy costs plus all sell proceeds.
//! 3. Weighted-average cost after buys (s1, p1), (s2, p2) equals
//!    (s1·p1 + s2·p2) / (s1 + s2).
//! 4. Replaying the engine's own trade log reproduces its state.
//!
//! Orders are generated from a fixed linear congruential sequence so the
//! test is deterministic; rejected orders are simply skipped.

use chrono::Utc;
use vtd_portfolio::{
    execute_trade, recompute_from_history, Action, Portfolio, TradeRequest,
};

const SYMBOLS: [&str; 4] = ["AAPL", "MSFT", "TSLA", "SPY"];

struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 33
    }

    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (self.next() % 10_000) as f64 / 10_000.0 * (hi - lo)
    }
}

#[test]
fn cash_and_shares_never_go_negative() {
    let mut rng = Lcg(42);
    let mut pf = Portfolio::new(100_000.0);
    let mut expected_cash = 100_000.0;
    let mut accepted = 0;

    for _ in 0..2_000 {
        let symbol = SYMBOLS[(rng.next() % 4) as usize];
        let action = if rng.next() % 3 == 0 { "sell" } else { "buy" };
        let shares = rng.range(0.5, 60.0);
        let price = rng.range(5.0, 500.0);

        let req = TradeRequest::parse(action, symbol, shares, price).unwrap();
        if let Ok(trade) = execute_trade(&mut pf, &req, Utc::now()) {
            accepted += 1;
            match trade.action {
                Action::Buy => expected_cash -= trade.notional(),
                Action::Sell => expected_cash += trade.notional(),
            }
        }

        assert!(pf.cash >= 0.0, "cash went negative: {}", pf.cash);
        for h in pf.holdings.values() {
            assert!(h.shares > 0.0, "{} has {} shares", h.symbol, h.shares);
            assert!(h.avg_price > 0.0);
        }
    }

    assert!(accepted > 100, "sequence should exercise many fills");
    assert!((pf.cash - expected_cash).abs() < 1e-4);

    let (cash, holdings) = recompute_from_history(100_000.0, &pf.history);
    assert!((cash - pf.cash).abs() < 1e-9);
    assert_eq!(holdings.len(), pf.holdings.len());
}

#[test]
fn two_buys_weighted_average() {
    let cases = [(10.0, 100.0, 30.0, 120.0), (1.5, 33.3, 2.25, 41.7), (7.0, 9.99, 7.0, 10.01)];

    for (s1, p1, s2, p2) in cases {
        let mut pf = Portfolio::new(1_000_000.0);
        execute_trade(&mut pf, &TradeRequest::parse("buy", "X", s1, p1).unwrap(), Utc::now())
            .unwrap();
        execute_trade(&mut pf, &TradeRequest::parse("buy", "X", s2, p2).unwrap(), Utc::now())
            .unwrap();

        let expected = (s1 * p1 + s2 * p2) / (s1 + s2);
        let h = pf.holding("X").unwrap();
        assert!((h.avg_price - expected).abs() < 1e-9);
        assert!((h.shares - (s1 + s2)).abs() < 1e-12);
    }
}
