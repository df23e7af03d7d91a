//! App state: config and the verified-domain cache.

use std::sync::Arc;

use tracing::info;

use allowlist_cache::VerifiedDomainCache;
use allowlist_core::constants::{ENV_FEDISEER_WHITELIST_URL, FEDISEER_WHITELIST_URL};
use allowlist_core::{AllowlistConfig, Result};
use allowlist_fediseer::{FediseerClient, FediseerConfig};

/// API server configuration.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Allowlist settings shared with the cache
    pub allowlist: AllowlistConfig,
    /// Fediseer whitelist endpoint
    pub whitelist_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            allowlist: AllowlistConfig::default(),
            whitelist_url: FEDISEER_WHITELIST_URL.into(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from the environment (and `.env` if present).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        Self {
            allowlist: AllowlistConfig::from_env(),
            whitelist_url: std::env::var(ENV_FEDISEER_WHITELIST_URL)
                .unwrap_or_else(|_| FEDISEER_WHITELIST_URL.into()),
        }
    }

    /// Client configuration for the Fediseer endpoint.
    pub fn fediseer_config(&self) -> FediseerConfig {
        FediseerConfig {
            endpoint: self.whitelist_url.clone(),
            ..FediseerConfig::from_allowlist_config(&self.allowlist)
        }
    }
}

/// Shared application state.
#[derive(Debug)]
pub struct AppState {
    /// Configuration
    pub config: ApiConfig,
    /// Verified-domain cache; `None` when filtering is disabled
    pub cache: Option<VerifiedDomainCache>,
}

impl AppState {
    /// Builds the state. With filtering enabled the cache is populated here,
    /// and a failed initial fetch aborts startup.
    pub async fn new(config: ApiConfig) -> Result<Self> {
        let cache = if config.allowlist.filter_verified_domains {
            let client = FediseerClient::with_config(config.fediseer_config())?;
            let cache = VerifiedDomainCache::from_config(&config.allowlist, Arc::new(client)).await?;
            Some(cache)
        } else {
            info!("Verified domain filter disabled, not fetching allowlist");
            None
        };

        Ok(Self { config, cache })
    }

    /// Creates state around an existing cache.
    pub fn with_cache(config: ApiConfig, cache: Option<VerifiedDomainCache>) -> Self {
        Self { config, cache }
    }
}
