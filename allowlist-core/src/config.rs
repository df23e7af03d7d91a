//! Configuration resolved from the environment.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::*;
use crate::types::RefreshParameters;

/// Allowlist configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowlistConfig {
    /// User agent sent upstream
    pub user_agent: String,
    /// Whether the export layer filters by verified domains
    pub filter_verified_domains: bool,
    /// Minimum endorsements
    pub endorsements: u32,
    /// Minimum guarantors
    pub guarantors: u32,
    /// Maximum number of domains
    pub return_limit: u32,
}

impl Default for AllowlistConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.into(),
            filter_verified_domains: false,
            endorsements: DEFAULT_ENDORSEMENTS,
            guarantors: DEFAULT_GUARANTORS,
            return_limit: DEFAULT_RETURN_LIMIT,
        }
    }
}

impl AllowlistConfig {
    /// Reads the configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, falling back to defaults.
    ///
    /// Numbers that fail to parse are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            user_agent: lookup(ENV_HTTP_USER_AGENT).unwrap_or(defaults.user_agent),
            filter_verified_domains: lookup(ENV_FILTER_VERIFIED_DOMAINS)
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.filter_verified_domains),
            endorsements: parse_or(
                &lookup,
                ENV_FILTER_VERIFIED_ENDORSEMENTS,
                defaults.endorsements,
            ),
            guarantors: parse_or(&lookup, ENV_FILTER_VERIFIED_GUARANTORS, defaults.guarantors),
            return_limit: parse_or(
                &lookup,
                ENV_FILTER_VERIFIED_RETURN_LIMIT,
                defaults.return_limit,
            ),
        }
    }

    /// Resolves the parameters a cache sends on every refresh.
    pub fn refresh_parameters(&self) -> RefreshParameters {
        RefreshParameters::new(self.endorsements, self.guarantors, self.return_limit)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "Unable to parse as number, ignoring");
            default
        }),
        None => default,
    }
}
