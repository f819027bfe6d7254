use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::TradeRejection;

/// BUY or SELL for trades.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Sell,
}

impl Action {
    /// Parse a user-supplied action string (case-insensitive).
    pub fn parse(s: &str) -> Result<Self, TradeRejection> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Action::Buy),
            "sell" => Ok(Action::Sell),
            other => Err(TradeRejection::InvalidAction {
                action: other.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "buy",
            Action::Sell => "sell",
        }
    }
}

/// An open position. `shares > 0` for every holding kept in a portfolio.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub shares: f64,
    /// Weighted-average cost basis per share.
    pub avg_price: f64,
}

impl Holding {
    pub fn new<S: Into<String>>(symbol: S, shares: f64, avg_price: f64) -> Self {
        debug_assert!(shares > 0.0, "Holding.shares must be > 0");
        debug_assert!(avg_price > 0.0, "Holding.avg_price must be > 0");
        Self {
            symbol: symbol.into(),
            shares,
            avg_price,
        }
    }

    /// Cost basis of the whole position.
    pub fn cost_basis(&self) -> f64 {
        self.shares * self.avg_price
    }
}

/// An executed trade (the accounting atom). Immutable once appended.
///
/// `date` is kept as the ISO-8601 string that was persisted so a damaged log
/// entry still round-trips; use [`Trade::timestamp`] to read it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub date: String,
    pub action: Action,
    pub symbol: String,
    pub shares: f64,
    pub price: f64,
}

impl Trade {
    pub fn new<S: Into<String>>(
        date: DateTime<Utc>,
        action: Action,
        symbol: S,
        shares: f64,
        price: f64,
    ) -> Self {
        Self {
            date: format_timestamp(date),
            action,
            symbol: symbol.into(),
            shares,
            price,
        }
    }

    /// Parsed trade date, `None` when the stored string is not ISO-8601.
    ///
    /// RFC 3339 first; a local date-time or a bare date is read as UTC.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.date.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(naive.and_utc());
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }

    /// shares × price.
    pub fn notional(&self) -> f64 {
        self.shares * self.price
    }
}

/// The persisted ledger: cash, open holdings keyed by symbol, and the
/// append-only trade log in insertion order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub cash: f64,
    #[serde(default)]
    pub holdings: BTreeMap<String, Holding>,
    #[serde(default)]
    pub history: Vec<Trade>,
}

impl Portfolio {
    pub fn new(starting_cash: f64) -> Self {
        Self {
            cash: starting_cash,
            holdings: BTreeMap::new(),
            history: Vec::new(),
        }
    }

    pub fn holding(&self, symbol: &str) -> Option<&Holding> {
        self.holdings.get(symbol)
    }

    /// Shares held for a symbol (0 if not held).
    pub fn shares_of(&self, symbol: &str) -> f64 {
        self.holdings.get(symbol).map(|h| h.shares).unwrap_or(0.0)
    }

    /// `true` if no open holdings exist.
    pub fn is_flat(&self) -> bool {
        self.holdings.is_empty()
    }

    /// cash + Σ(shares × avg_price).
    pub fn book_value(&self) -> f64 {
        self.cash + self.holdings.values().map(Holding::cost_basis).sum::<f64>()
    }
}

/// One point of the valuation history: total portfolio value at `date`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValuePoint {
    pub date: DateTime<Utc>,
    pub value: f64,
}

impl ValuePoint {
    pub fn new(date: DateTime<Utc>, value: f64) -> Self {
        Self { date, value }
    }
}

/// Canonical ISO-8601 rendering used for persisted trade dates.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
