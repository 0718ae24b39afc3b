//! Application context
//!
//! One place that loads configuration and constructs the shared
//! adapters every command needs. Construction performs no validation
//! and no remote calls; commands validate the sections they use.

use std::path::PathBuf;
use std::sync::Arc;

use costsync_core::{BillingApi, MappingCache, NoopCache};
use costsync_domain::{Config, Result};
use costsync_infra::{config, CostCenterCache, GitHubBillingClient};

pub struct AppContext {
    pub config: Config,
    pub api: Arc<dyn BillingApi>,
    pub cache: Arc<dyn MappingCache>,
}

impl AppContext {
    pub fn new(config_path: Option<PathBuf>) -> Result<Self> {
        let config = config::load(config_path)?;

        let api: Arc<dyn BillingApi> = Arc::new(GitHubBillingClient::new(&config.github)?);
        let cache: Arc<dyn MappingCache> = if config.cache.enabled {
            Arc::new(CostCenterCache::open(&config.cache))
        } else {
            Arc::new(NoopCache)
        };

        Ok(Self { config, api, cache })
    }
}
