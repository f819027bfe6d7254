//! Scenario: JSON-file persistence survives a process restart
//!
//! # Invariants under test
//!
//! 1. A portfolio saved through one repository is loaded unchanged by a
//!    fresh repository over the same directory.
//! 2. Reset through the second repository deletes both files; the next load
//!    starts again from the configured starting cash.

use chrono::Utc;
use vtd_portfolio::{execute_trade, TradeRequest, ValuePoint};
use vtd_store::{JsonFileStore, PortfolioRepository, HISTORY_KEY, KeyValueStore, PORTFOLIO_KEY};

#[test]
fn saved_state_reloads_after_restart_and_reset_clears_it() {
    let dir = tempfile::tempdir().unwrap();

    let first = PortfolioRepository::new(JsonFileStore::new(dir.path()), 50_000.0, 100);
    let mut pf = first.load().unwrap();
    let req = TradeRequest::parse("buy", "AAPL", 10.0, 150.0).unwrap();
    execute_trade(&mut pf, &req, Utc::now()).unwrap();
    first.save(&pf).unwrap();
    first
        .append_history(ValuePoint::new(Utc::now(), 50_000.0))
        .unwrap();
    drop(first);

    let second = PortfolioRepository::new(JsonFileStore::new(dir.path()), 50_000.0, 100);
    let reloaded = second.load().unwrap();
    assert_eq!(reloaded, pf);
    assert_eq!(second.load_history().unwrap().unwrap().len(), 1);

    second.reset().unwrap();
    assert_eq!(second.store().get(PORTFOLIO_KEY).unwrap(), None);
    assert_eq!(second.store().get(HISTORY_KEY).unwrap(), None);

    let fresh = second.load().unwrap();
    assert_eq!(fresh.cash, 50_000.0);
    assert!(fresh.history.is_empty());
}
