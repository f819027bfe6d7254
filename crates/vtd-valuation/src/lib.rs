//! vtd-valuation
//!
//! Value-history derivation for the virtual portfolio.
//! - Live reconstruction from the trade log at current oracle prices
//! - Synthetic reconstruction on deterministic simulated price paths
//! - Demo curve for an empty ledger
//! - Sort + consecutive-duplicate collapse for chart consumption
//!
//! Randomness comes only from [`KeyedStream`]: a hash keyed by a string and
//! an index, so every synthetic value is reproducible.

mod normalizer;
mod prng;
mod reconstruct;
mod synthetic;

pub use normalizer::normalize;
pub use prng::KeyedStream;
pub use reconstruct::{HistoryBuilder, LiveReconstruction, ReconstructionMode};
pub use synthetic::{simulated_price, SyntheticSeries, DEFAULT_SEED, DEFAULT_WINDOW_DAYS};
