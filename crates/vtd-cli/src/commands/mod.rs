//! Command handler modules for the `vtd` CLI.
//!
//! Shared bootstrap lives here; command-specific logic lives in the
//! submodules.

pub mod report;
pub mod trade;

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use vtd_config::{load_layered_yaml, resolve_secrets, DeskConfig, UnusedKeyPolicy};
use vtd_md::PriceOracle;
use vtd_runtime::{build_oracle, PortfolioService};
use vtd_store::JsonFileStore;

/// Everything a command needs, built once per invocation.
pub struct Desk {
    pub config: DeskConfig,
    pub oracle: Arc<dyn PriceOracle>,
    pub service: Arc<PortfolioService<JsonFileStore>>,
}

impl Desk {
    pub fn open(config_paths: &[PathBuf], store_dir: Option<PathBuf>, offline: bool) -> Result<Self> {
        let mut config = if config_paths.is_empty() {
            DeskConfig::default()
        } else {
            let loaded = load_layered_yaml(config_paths, UnusedKeyPolicy::Warn)?;
            for p in loaded.unused_leaf_pointers.iter().take(50) {
                warn!(key = %p, "CONFIG_UNUSED_KEYS: config key is not read by anything");
            }
            loaded.config
        };
        if let Some(dir) = store_dir {
            config.store.dir = dir;
        }

        let secrets = resolve_secrets(&config);
        let oracle = build_oracle(&config, &secrets, offline)?;
        let store = JsonFileStore::new(config.store.dir.clone());
        debug!(dir = %config.store.dir.display(), oracle = oracle.source_name(), "desk opened");

        let service = Arc::new(PortfolioService::from_config(
            store,
            Arc::clone(&oracle),
            &config,
        ));
        Ok(Self {
            config,
            oracle,
            service,
        })
    }
}
