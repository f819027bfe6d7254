//! vtd-runtime
//!
//! Wires ledger, store, oracle and history builder into one serialized
//! [`PortfolioService`], plus the cancelable background refresh task.

pub mod oracle;
pub mod refresh;
pub mod service;

pub use oracle::{build_oracle, retry_policy};
pub use refresh::{spawn_refresh, RefreshHandle};
pub use service::{PortfolioService, RefreshReport, TradeOutcome};
pub use vtd_valuation::ReconstructionMode;
