//! vtd-store
//!
//! Persistence for the virtual portfolio: a small key-value store contract
//! with in-memory and JSON-file backends, and the portfolio repository that
//! owns the `virtual_portfolio` / `virtual_portfolio_value_history` keys.

pub mod kv;
pub mod repository;

pub use kv::{JsonFileStore, KeyValueStore, MemoryStore};
pub use repository::{
    cap_history, PortfolioRepository, DEFAULT_HISTORY_CAP, DEFAULT_STARTING_CASH, HISTORY_KEY,
    PORTFOLIO_KEY,
};
