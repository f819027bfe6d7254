//! Trade ordering policy for reconstruction.
//!
//! The trade log is stored in insertion order, but reconstruction replays it
//! by date. A log entry whose date is not ISO-8601 is dated `now` and kept;
//! it is never dropped and never stops the rest of the log from replaying.
//!
//! # Canonical sort key
//!
//! `(timestamp, insertion_index)` ascending. The sort is stable, so trades
//! sharing a timestamp keep their original relative order.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::types::Trade;

/// A trade paired with the timestamp used to order and date it.
#[derive(Clone, Debug, PartialEq)]
pub struct DatedTrade {
    pub at: DateTime<Utc>,
    pub trade: Trade,
}

/// Resolve a trade's timestamp, substituting `now` for an unparseable date.
pub fn trade_time(trade: &Trade, now: DateTime<Utc>) -> DateTime<Utc> {
    match trade.timestamp() {
        Some(at) => at,
        None => {
            warn!(
                symbol = %trade.symbol,
                date = %trade.date,
                "unparseable trade date; using current time"
            );
            now
        }
    }
}

/// Date every trade and sort ascending by date (stable).
pub fn sort_trades_by_date(trades: &[Trade], now: DateTime<Utc>) -> Vec<DatedTrade> {
    let mut dated: Vec<DatedTrade> = trades
        .iter()
        .map(|t| DatedTrade {
            at: trade_time(t, now),
            trade: t.clone(),
        })
        .collect();
    dated.sort_by(|a, b| a.at.cmp(&b.at));
    dated
}
