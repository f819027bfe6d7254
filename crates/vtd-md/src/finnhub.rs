//! Finnhub-backed quote oracle.
//!
//! `GET {base_url}/quote?symbol=SYM` with the API key in the
//! `X-Finnhub-Token` header. The response field `c` is the current price;
//! Finnhub answers unknown symbols with an all-zero quote.
//!
//! The API key is passed in by the caller (read from the environment); do
//! not log it.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::oracle::{PriceOracle, Quote, QuoteError};

pub const FINNHUB_BASE_URL: &str = "https://finnhub.io/api/v1";

#[derive(Debug, Clone)]
pub struct FinnhubOracle {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
}

impl FinnhubOracle {
    pub fn new(api_key: String) -> Result<Self, QuoteError> {
        Self::new_with_base_url(
            api_key,
            FINNHUB_BASE_URL.to_string(),
            Duration::from_secs(5),
        )
    }

    pub fn new_with_base_url(
        api_key: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, QuoteError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QuoteError::Config(format!("http client build failed: {e}")))?;
        Ok(Self {
            api_key,
            http,
            base_url,
        })
    }

    fn quote_url(&self) -> String {
        format!("{}/quote", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone, Deserialize)]
struct QuoteResponse {
    /// Current price.
    c: f64,
    /// High of the day.
    #[serde(default)]
    h: Option<f64>,
    /// Low of the day.
    #[serde(default)]
    l: Option<f64>,
}

impl QuoteResponse {
    fn is_empty(&self) -> bool {
        self.c == 0.0 && self.h.unwrap_or(0.0) == 0.0 && self.l.unwrap_or(0.0) == 0.0
    }
}

fn retry_after(resp: &reqwest::Response) -> Option<Duration> {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait::async_trait]
impl PriceOracle for FinnhubOracle {
    fn source_name(&self) -> &'static str {
        "finnhub"
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, QuoteError> {
        if self.api_key.trim().is_empty() {
            return Err(QuoteError::Config("finnhub api key required".to_string()));
        }
        let symbol = symbol.trim().to_ascii_uppercase();
        debug!(%symbol, "finnhub quote request");

        let resp = self
            .http
            .get(self.quote_url())
            .query(&[("symbol", symbol.as_str())])
            .header("X-Finnhub-Token", self.api_key.as_str())
            .send()
            .await
            .map_err(|e| QuoteError::Transport(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(QuoteError::RateLimited {
                retry_after: retry_after(&resp),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(QuoteError::Http {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| QuoteError::Transport(e.to_string()))?;
        let data: QuoteResponse =
            serde_json::from_str(&body).map_err(|e| QuoteError::Decode(e.to_string()))?;

        if data.is_empty() || !data.c.is_finite() || data.c <= 0.0 {
            return Err(QuoteError::NoData { symbol });
        }

        Ok(Quote {
            symbol,
            current_price: data.c,
        })
    }
}

// -----------------
// Tests (local mock server, no network)
// -----------------

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn oracle(server: &MockServer) -> FinnhubOracle {
        FinnhubOracle::new_with_base_url(
            "test-key".to_string(),
            server.base_url(),
            Duration::from_secs(2),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn parses_current_price() {
        let server = MockServer::start_async().await;
        let m = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/quote")
                    .query_param("symbol", "AAPL")
                    .header("X-Finnhub-Token", "test-key");
                then.status(200)
                    .json_body(json!({"c": 189.5, "h": 191.0, "l": 187.2, "o": 188.0, "pc": 188.4}));
            })
            .await;

        let q = oracle(&server).get_quote("aapl").await.unwrap();
        m.assert_async().await;
        assert_eq!(q.symbol, "AAPL");
        assert_eq!(q.current_price, 189.5);
    }

    #[tokio::test]
    async fn status_429_is_rate_limited_with_hint() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/quote");
                then.status(429).header("Retry-After", "3");
            })
            .await;

        let err = oracle(&server).get_quote("AAPL").await.unwrap_err();
        assert_eq!(
            err,
            QuoteError::RateLimited {
                retry_after: Some(Duration::from_secs(3))
            }
        );
    }

    #[tokio::test]
    async fn non_2xx_is_http_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/quote");
                then.status(503).body("maintenance");
            })
            .await;

        let err = oracle(&server).get_quote("AAPL").await.unwrap_err();
        assert_eq!(
            err,
            QuoteError::Http {
                status: 503,
                message: "maintenance".to_string()
            }
        );
    }

    #[tokio::test]
    async fn malformed_payload_is_decode_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/quote");
                then.status(200).body("<html>oops</html>");
            })
            .await;

        let err = oracle(&server).get_quote("AAPL").await.unwrap_err();
        assert!(matches!(err, QuoteError::Decode(_)));
    }

    #[tokio::test]
    async fn all_zero_quote_is_no_data() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/quote");
                then.status(200).json_body(json!({"c": 0, "h": 0, "l": 0}));
            })
            .await;

        let err = oracle(&server).get_quote("NOPE").await.unwrap_err();
        assert_eq!(
            err,
            QuoteError::NoData {
                symbol: "NOPE".to_string()
            }
        );
    }

    #[tokio::test]
    async fn missing_key_is_config_error_without_request() {
        let o = FinnhubOracle::new_with_base_url(
            String::new(),
            "http://127.0.0.1:9".to_string(),
            Duration::from_secs(1),
        )
        .unwrap();
        let err = o.get_quote("AAPL").await.unwrap_err();
        assert!(matches!(err, QuoteError::Config(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        let o = FinnhubOracle::new_with_base_url(
            "k".to_string(),
            "http://127.0.0.1:9".to_string(),
            Duration::from_millis(500),
        )
        .unwrap();
        let err = o.get_quote("AAPL").await.unwrap_err();
        assert!(matches!(err, QuoteError::Transport(_)));
    }
}
