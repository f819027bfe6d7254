//! Trade engine: validates and applies buy/sell orders against a [`Portfolio`].
//!
//! # Purpose
//! [`accounting`](crate::accounting) owns the raw cash/weighted-average
//! mechanics shared with log replay. This module owns the validation
//! boundary in front of them:
//!
//! - Normalizes requests (uppercase symbol, absolute share count).
//! - Rejects non-finite or non-positive prices and share counts.
//! - Rejects buys the cash balance cannot cover and sells of shares not held.
//! - Applies the whole order or nothing; there are no partial fills.
//!
//! Rejections are ordinary outcomes, returned as [`TradeRejection`]. The
//! portfolio is **not** mutated when a rejection is returned.
//!
//! # Usage
//! ```ignore
//! let mut pf = Portfolio::new(100_000.0);
//! let req = TradeRequest::parse("buy", "aapl", 10.0, 150.0)?;
//! let trade = execute_trade(&mut pf, &req, Utc::now())?;
//! assert_eq!(pf.cash, 98_500.0);
//! ```
//!
//! The engine never fetches prices; the caller supplies the execution price.

use chrono::{DateTime, Utc};

use crate::{
    accounting::{apply_buy, apply_sell, SHARE_EPSILON},
    types::{Action, Portfolio, Trade},
};

// ---------------------------------------------------------------------------
// Rejections
// ---------------------------------------------------------------------------

/// Business-rule violations surfaced by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum TradeRejection {
    /// Action was neither `buy` nor `sell`.
    InvalidAction { action: String },
    /// Symbol was empty after trimming.
    InvalidSymbol,
    /// Share count was zero or not finite.
    InvalidShares { shares: f64 },
    /// Price was zero, negative, or not finite.
    InvalidPrice { price: f64 },
    /// Cash does not cover `shares × price`.
    InsufficientFunds { required: f64, available: f64 },
    /// Symbol not held, or fewer shares held than requested.
    InsufficientShares {
        symbol: String,
        held: f64,
        requested: f64,
    },
}

impl TradeRejection {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidAction { .. } => "INVALID_ACTION",
            Self::InvalidSymbol => "INVALID_SYMBOL",
            Self::InvalidShares { .. } => "INVALID_SHARES",
            Self::InvalidPrice { .. } => "INVALID_PRICE",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::InsufficientShares { .. } => "INSUFFICIENT_SHARES",
        }
    }
}

impl std::fmt::Display for TradeRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAction { action } => {
                write!(f, "invalid action '{action}': expected buy or sell")
            }
            Self::InvalidSymbol => write!(f, "symbol must not be empty"),
            Self::InvalidShares { shares } => {
                write!(f, "shares must be a positive number, got {shares}")
            }
            Self::InvalidPrice { price } => {
                write!(f, "price must be a positive number, got {price}")
            }
            Self::InsufficientFunds {
                required,
                available,
            } => write!(
                f,
                "insufficient funds: order costs {required:.2}, cash available {available:.2}"
            ),
            Self::InsufficientShares {
                symbol,
                held,
                requested,
            } => write!(
                f,
                "insufficient shares of {symbol}: holding {held}, requested {requested}"
            ),
        }
    }
}

impl std::error::Error for TradeRejection {}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A normalized, validated order.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRequest {
    pub action: Action,
    pub symbol: String,
    pub shares: f64,
    pub price: f64,
}

impl TradeRequest {
    /// Build a request: symbol uppercased, shares made absolute, price checked.
    pub fn new(
        action: Action,
        symbol: &str,
        shares: f64,
        price: f64,
    ) -> Result<Self, TradeRejection> {
        let symbol = symbol.trim().to_ascii_uppercase();
        if symbol.is_empty() {
            return Err(TradeRejection::InvalidSymbol);
        }
        let shares = shares.abs();
        if !shares.is_finite() || shares <= 0.0 {
            return Err(TradeRejection::InvalidShares { shares });
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(TradeRejection::InvalidPrice { price });
        }
        Ok(Self {
            action,
            symbol,
            shares,
            price,
        })
    }

    /// As [`TradeRequest::new`], parsing the action string first.
    pub fn parse(
        action: &str,
        symbol: &str,
        shares: f64,
        price: f64,
    ) -> Result<Self, TradeRejection> {
        Self::new(Action::parse(action)?, symbol, shares, price)
    }

    /// shares × price.
    pub fn notional(&self) -> f64 {
        self.shares * self.price
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Validate `req` against `pf` and apply it, appending the trade dated `at`.
///
/// # Errors
/// Returns [`TradeRejection`] when the order cannot be filled in full. The
/// portfolio is unchanged in that case.
pub fn execute_trade(
    pf: &mut Portfolio,
    req: &TradeRequest,
    at: DateTime<Utc>,
) -> Result<Trade, TradeRejection> {
    check(pf, req)?;

    match req.action {
        Action::Buy => apply_buy(
            &mut pf.cash,
            &mut pf.holdings,
            &req.symbol,
            req.shares,
            req.price,
        ),
        Action::Sell => apply_sell(
            &mut pf.cash,
            &mut pf.holdings,
            &req.symbol,
            req.shares,
            req.price,
        ),
    }

    let trade = Trade::new(at, req.action, req.symbol.clone(), req.shares, req.price);
    pf.history.push(trade.clone());
    Ok(trade)
}

/// Pre-trade checks only; never mutates.
pub fn check(pf: &Portfolio, req: &TradeRequest) -> Result<(), TradeRejection> {
    match req.action {
        Action::Buy => {
            let required = req.notional();
            if pf.cash < required {
                return Err(TradeRejection::InsufficientFunds {
                    required,
                    available: pf.cash,
                });
            }
        }
        Action::Sell => {
            let held = pf.shares_of(&req.symbol);
            if held <= 0.0 || held + SHARE_EPSILON < req.shares {
                return Err(TradeRejection::InsufficientShares {
                    symbol: req.symbol.clone(),
                    held,
                    requested: req.shares,
                });
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
