//! Fediseer whitelist client.
//!
//! One GET against `/api/v1/whitelist` per refresh. The response is a JSON
//! object; only its `domains` field is read.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use allowlist_core::constants::{DEFAULT_USER_AGENT, FEDISEER_WHITELIST_URL, FETCH_TIMEOUT_SECS};
use allowlist_core::error::{AllowlistError, FetchError, Result};
use allowlist_core::traits::AllowlistFetcher;
use allowlist_core::types::RefreshParameters;
use allowlist_core::AllowlistConfig;

/// Fediseer client configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FediseerConfig {
    /// Full whitelist endpoint URL
    pub endpoint: String,
    /// User agent sent with every request
    pub user_agent: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for FediseerConfig {
    fn default() -> Self {
        Self {
            endpoint: FEDISEER_WHITELIST_URL.into(),
            user_agent: DEFAULT_USER_AGENT.into(),
            timeout_seconds: FETCH_TIMEOUT_SECS,
        }
    }
}

impl FediseerConfig {
    /// Creates a config for a custom endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Takes the user agent from the allowlist configuration.
    pub fn from_allowlist_config(config: &AllowlistConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            ..Default::default()
        }
    }

    /// Overrides the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Builds the whitelist query for `params`.
///
/// `guarantors` carries the configured guarantor minimum, not the
/// endorsement minimum.
pub fn whitelist_query(params: &RefreshParameters) -> Vec<(&'static str, String)> {
    vec![
        ("endorsements", params.endorsements.to_string()),
        ("guarantors", params.guarantors.to_string()),
        ("software_csv", params.software.clone()),
        ("limit", params.limit.to_string()),
        ("domains", "true".to_string()),
    ]
}

/// Client for the Fediseer whitelist API.
pub struct FediseerClient {
    config: FediseerConfig,
    http_client: reqwest::Client,
}

impl FediseerClient {
    /// Creates a client with the default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(FediseerConfig::default())
    }

    /// Creates a client with the given config.
    pub fn with_config(config: FediseerConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| AllowlistError::ConfigError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &FediseerConfig {
        &self.config
    }

    /// Fetches verified domains matching `params`.
    #[instrument(skip(self), fields(endpoint = %self.config.endpoint))]
    pub async fn fetch_domains(
        &self,
        params: &RefreshParameters,
    ) -> std::result::Result<Vec<String>, FetchError> {
        let response = self
            .http_client
            .get(&self.config.endpoint)
            .query(&whitelist_query(params))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Fediseer whitelist request failed");
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        let domains = parse_domains(&body)?;

        debug!(domains = domains.len(), "Fetched Fediseer whitelist");
        Ok(domains)
    }

    fn transport_error(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                seconds: self.config.timeout_seconds,
            }
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl AllowlistFetcher for FediseerClient {
    async fn fetch(&self, params: &RefreshParameters) -> std::result::Result<Vec<String>, FetchError> {
        self.fetch_domains(params).await
    }
}

/// Extracts the `domains` list from a whitelist response body.
fn parse_domains(body: &str) -> std::result::Result<Vec<String>, FetchError> {
    let json: serde_json::Value =
        serde_json::from_str(body).map_err(|e| FetchError::InvalidBody(e.to_string()))?;

    let object = json
        .as_object()
        .ok_or_else(|| FetchError::InvalidBody("expected a JSON object".into()))?;

    let domains = object.get("domains").ok_or(FetchError::MissingDomains)?;

    Vec::<String>::deserialize(domains)
        .map_err(|e| FetchError::InvalidBody(format!("\"domains\" is not a list of strings: {e}")))
}
