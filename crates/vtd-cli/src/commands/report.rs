//! Read-side commands: show, history, rebuild, refresh, watch.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use vtd_md::PriceTier;
use vtd_portfolio::{format_timestamp, PortfolioSummary, ValuePoint};
use vtd_runtime::{spawn_refresh, ReconstructionMode};

use super::Desk;

pub async fn show(desk: &Desk, json: bool) -> Result<()> {
    let prices = desk.service.mark_holdings().await?;
    let summary = desk.service.summary().await?;

    if json {
        let s = serde_json::to_string_pretty(&summary).context("summary json encode failed")?;
        println!("{s}");
        return Ok(());
    }

    print_summary(&summary);
    for p in prices.values().filter(|p| p.tier != PriceTier::Live) {
        println!("note: {} priced at {} ({:.2})", p.symbol, p.tier, p.price);
    }
    Ok(())
}

fn print_summary(s: &PortfolioSummary) {
    println!("cash          {:>14.2}", s.cash);
    println!("market_value  {:>14.2}", s.market_value);
    println!("total_value   {:>14.2}", s.total_value);
    println!(
        "gain_loss     {:>14.2} ({:.2}%)",
        s.total_gain_loss, s.total_gain_loss_percent
    );
    if s.holdings.is_empty() {
        println!("holdings      none");
        return;
    }
    println!(
        "{:<8} {:>10} {:>10} {:>10} {:>12} {:>10} {:>7}",
        "SYMBOL", "SHARES", "AVG", "PRICE", "VALUE", "GAIN%", "ALLOC%"
    );
    for h in &s.holdings {
        println!(
            "{:<8} {:>10} {:>10.2} {:>10.2} {:>12.2} {:>10.2} {:>7.2}",
            h.symbol,
            h.shares,
            h.avg_price,
            h.current_price,
            h.market_value,
            h.gain_loss_percent,
            h.allocation_percent
        );
    }
}

fn print_points(points: &[ValuePoint], json: bool) -> Result<()> {
    if json {
        let s = serde_json::to_string_pretty(points).context("history json encode failed")?;
        println!("{s}");
    } else {
        for p in points {
            println!("{}  {:.2}", format_timestamp(p.date), p.value);
        }
    }
    Ok(())
}

pub async fn history(desk: &Desk, json: bool) -> Result<()> {
    let points = desk.service.value_history().await?;
    print_points(&points, json)
}

pub async fn rebuild(desk: &Desk, synthetic: bool) -> Result<()> {
    let mode = if synthetic {
        ReconstructionMode::Synthetic
    } else {
        ReconstructionMode::Live
    };
    let points = desk.service.rebuild_history(mode).await?;
    println!("rebuild=OK mode={} points={}", mode.as_str(), points.len());
    Ok(())
}

pub async fn refresh(desk: &Desk) -> Result<()> {
    let report = desk.service.refresh().await?;
    println!(
        "refresh=OK value={:.2} points={}",
        report.point.value, report.history_len
    );
    for sym in report.degraded() {
        println!("note: {sym} priced from fallback");
    }
    Ok(())
}

pub async fn watch(desk: &Desk, interval_secs: Option<u64>) -> Result<()> {
    let interval = match interval_secs {
        Some(s) => Duration::from_secs(s.max(1)),
        None => desk.config.refresh_interval(),
    };
    let handle = spawn_refresh(Arc::clone(&desk.service), interval);
    info!(interval_secs = interval.as_secs(), "watching; Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    handle.cancel().await;
    println!("watch=STOPPED");
    Ok(())
}
