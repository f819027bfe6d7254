//! Scenario: the `vtd` CLI drives the ledger end to end
//!
//! # Invariants under test
//!
//! 1. buy 10 AAPL @150 then sell 10 @160 leaves cash 100100 and no holding,
//!    and the state survives across process invocations.
//! 2. A rejected order exits non-zero with its code; state is unchanged.
//! 3. Without --price an offline desk refuses to trade.
//! 4. `reset` refuses without --yes and restores starting cash with it.
//! 5. Layered config changes starting cash; a literal secret aborts startup.
//!
//! Every invocation runs `--offline` against a temp store dir.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;

#[allow(deprecated)]
fn vtd(store: &Path) -> Command {
    let mut cmd = Command::cargo_bin("vtd").unwrap();
    cmd.arg("--offline")
        .arg("--store-dir")
        .arg(store)
        .env("RUST_LOG", "warn");
    cmd
}

fn summary(store: &Path) -> Value {
    let out = vtd(store).args(["show", "--json"]).output().unwrap();
    assert!(out.status.success());
    serde_json::from_slice(&out.stdout).unwrap()
}

#[test]
fn buy_then_sell_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path();

    vtd(store)
        .args(["buy", "aapl", "10", "--price", "150"])
        .assert()
        .success()
        .stdout(predicate::str::contains("buy 10 AAPL @ 150.00; cash 98500.00"));

    let s = summary(store);
    assert_eq!(s["cash"], 98_500.0);
    assert_eq!(s["holdings"][0]["symbol"], "AAPL");
    assert_eq!(s["holdings"][0]["avg_price"], 150.0);

    vtd(store)
        .args(["sell", "AAPL", "10", "--price", "160"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cash 100100.00"));

    let s = summary(store);
    assert_eq!(s["cash"], 100_100.0);
    assert_eq!(s["holdings"].as_array().map(Vec::len), Some(0));

    assert!(store.join("virtual_portfolio.json").exists());
    assert!(store.join("virtual_portfolio_value_history.json").exists());
}

#[test]
fn rejected_orders_fail_and_change_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path();

    vtd(store)
        .args(["buy", "TSLA", "1000", "--price", "1000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("INSUFFICIENT_FUNDS"));

    vtd(store)
        .args(["sell", "NFLX", "1", "--price", "400"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("INSUFFICIENT_SHARES"));

    assert_eq!(summary(store)["cash"], 100_000.0);
}

#[test]
fn offline_trade_needs_explicit_price() {
    let dir = tempfile::tempdir().unwrap();
    vtd(dir.path())
        .args(["buy", "AAPL", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pass --price"));
}

#[test]
fn history_and_rebuild() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path();

    let out = vtd(store).args(["history", "--json"]).output().unwrap();
    assert!(out.status.success());
    let points: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(points.as_array().map(Vec::len), Some(1));
    assert_eq!(points[0]["value"], 100_000.0);

    vtd(store)
        .args(["rebuild", "--synthetic"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mode=synthetic points=30"));

    vtd(store)
        .arg("refresh")
        .assert()
        .success()
        .stdout(predicate::str::contains("points=31"));
}

#[test]
fn reset_requires_yes() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path();

    vtd(store)
        .args(["buy", "SPY", "2", "--price", "500"])
        .assert()
        .success();

    vtd(store)
        .arg("reset")
        .assert()
        .failure()
        .stderr(predicate::str::contains("REFUSING RESET"));
    assert_eq!(summary(store)["cash"], 99_000.0);

    vtd(store).args(["reset", "--yes"]).assert().success();
    assert_eq!(summary(store)["cash"], 100_000.0);
}

#[test]
fn config_layers_apply() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("store");
    let cfg = dir.path().join("desk.yaml");
    std::fs::write(&cfg, "portfolio:\n  starting_cash: 5000\n").unwrap();

    let out = vtd(&store)
        .arg("--config")
        .arg(&cfg)
        .args(["show", "--json"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let s: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(s["cash"], 5_000.0);

    let bad = dir.path().join("bad.yaml");
    std::fs::write(&bad, "oracle:\n  api_key_env: \"sk-live-0123456789abcdef\"\n").unwrap();
    vtd(&store)
        .arg("--config")
        .arg(&bad)
        .arg("show")
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_SECRET_DETECTED"));
}
