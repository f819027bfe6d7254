//! Price oracle boundary.
//!
//! This module defines **only** the quote type, the error taxonomy and the
//! oracle trait. Concrete oracles live in sibling modules; the fallback
//! policy lives in [`crate::fallback`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Quote
// ---------------------------------------------------------------------------

/// A current quote for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub symbol: String,
    pub current_price: f64,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors an oracle may return. None of them are fatal to callers.
#[derive(Debug, Clone, PartialEq)]
pub enum QuoteError {
    /// Network or transport failure (includes timeouts).
    Transport(String),
    /// Non-2xx response other than rate limiting.
    Http { status: u16, message: String },
    /// Upstream rate limit (HTTP 429). `retry_after` is the server hint, if any.
    RateLimited { retry_after: Option<Duration> },
    /// Response payload could not be decoded.
    Decode(String),
    /// Upstream answered but had no usable price for the symbol.
    NoData { symbol: String },
    /// Missing or invalid configuration (e.g. no API key).
    Config(String),
}

impl QuoteError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, QuoteError::RateLimited { .. })
    }
}

impl fmt::Display for QuoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteError::Transport(msg) => write!(f, "transport error: {msg}"),
            QuoteError::Http { status, message } => {
                write!(f, "quote http error status={status}: {message}")
            }
            QuoteError::RateLimited {
                retry_after: Some(d),
            } => write!(f, "rate limited (retry after {}s)", d.as_secs()),
            QuoteError::RateLimited { retry_after: None } => write!(f, "rate limited"),
            QuoteError::Decode(msg) => write!(f, "decode error: {msg}"),
            QuoteError::NoData { symbol } => write!(f, "no quote data for {symbol}"),
            QuoteError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for QuoteError {}

// ---------------------------------------------------------------------------
// Oracle trait
// ---------------------------------------------------------------------------

/// Given a symbol, return a current price or fail.
///
/// Implementations must be `Send + Sync` so one oracle can serve concurrent
/// lookups from the valuation fan-out and the refresh task.
#[async_trait::async_trait]
pub trait PriceOracle: Send + Sync {
    /// Human-readable name (e.g. `"finnhub"`).
    fn source_name(&self) -> &'static str;

    async fn get_quote(&self, symbol: &str) -> Result<Quote, QuoteError>;
}

#[async_trait::async_trait]
impl<T: PriceOracle + ?Sized> PriceOracle for Arc<T> {
    fn source_name(&self) -> &'static str {
        (**self).source_name()
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, QuoteError> {
        (**self).get_quote(symbol).await
    }
}

// ---------------------------------------------------------------------------
// Static oracle
// ---------------------------------------------------------------------------

/// Fixed price table. Unknown symbols answer [`QuoteError::NoData`].
///
/// Used offline (CLI `--offline`) and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticQuoteOracle {
    prices: BTreeMap<String, f64>,
}

impl StaticQuoteOracle {
    pub fn new<I, S>(prices: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            prices: prices
                .into_iter()
                .map(|(s, p)| (s.into().to_ascii_uppercase(), p))
                .collect(),
        }
    }

    /// An oracle that knows nothing; every lookup falls back.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn set(&mut self, symbol: &str, price: f64) {
        self.prices.insert(symbol.to_ascii_uppercase(), price);
    }
}

#[async_trait::async_trait]
impl PriceOracle for StaticQuoteOracle {
    fn source_name(&self) -> &'static str {
        "static"
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, QuoteError> {
        let key = symbol.to_ascii_uppercase();
        match self.prices.get(&key) {
            Some(p) => Ok(Quote {
                symbol: key,
                current_price: *p,
            }),
            None => Err(QuoteError::NoData { symbol: key }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_oracle_is_case_insensitive() {
        let o = StaticQuoteOracle::new([("aapl", 190.5)]);
        let q = o.get_quote("AAPL").await.unwrap();
        assert_eq!(q.current_price, 190.5);
        assert_eq!(q.symbol, "AAPL");
    }

    #[tokio::test]
    async fn static_oracle_unknown_symbol_is_no_data() {
        let o = StaticQuoteOracle::empty();
        let err = o.get_quote("zzz").await.unwrap_err();
        assert_eq!(
            err,
            QuoteError::NoData {
                symbol: "ZZZ".to_string()
            }
        );
    }

    #[tokio::test]
    async fn oracle_is_object_safe_behind_arc() {
        let o: Arc<dyn PriceOracle> = Arc::new(StaticQuoteOracle::new([("SPY", 500.0)]));
        assert_eq!(o.source_name(), "static");
        assert_eq!(o.get_quote("spy").await.unwrap().current_price, 500.0);
    }

    #[test]
    fn quote_error_display() {
        assert_eq!(
            QuoteError::Http {
                status: 503,
                message: "unavailable".to_string()
            }
            .to_string(),
            "quote http error status=503: unavailable"
        );
        assert_eq!(
            QuoteError::RateLimited {
                retry_after: Some(Duration::from_secs(2))
            }
            .to_string(),
            "rate limited (retry after 2s)"
        );
        assert!(QuoteError::RateLimited { retry_after: None }.is_rate_limited());
    }
}
