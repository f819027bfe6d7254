//! vtd-md
//!
//! Market-data side of the virtual portfolio: the price oracle contract the
//! ledger consumes, a Finnhub quote oracle, a rate-limit retry wrapper, and
//! the fallback ladder that turns any oracle failure into a usable price.
//!
//! Nothing here touches the ledger or the store.

pub mod fallback;
pub mod finnhub;
pub mod oracle;
pub mod retry;

pub use fallback::{resolve_price, resolve_prices, PriceRequest, PriceTier, ResolvedPrice};
pub use finnhub::{FinnhubOracle, FINNHUB_BASE_URL};
pub use oracle::{PriceOracle, Quote, QuoteError, StaticQuoteOracle};
pub use retry::{RetryPolicy, RetryingOracle};
