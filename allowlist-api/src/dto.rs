//! Response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use allowlist_cache::CacheStats;

/// GET /health
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always "ok" when the server answers
    pub status: String,
    /// Crate version
    pub version: String,
    /// Whether the verified-domain filter is enabled
    pub filter_enabled: bool,
    /// Cache statistics, present when filtering is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStatsDto>,
}

/// Cache statistics as reported by the health endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct CacheStatsDto {
    /// Number of cached domains
    pub domains: usize,
    /// Successful refreshes
    pub refreshes: u64,
    /// Failed refreshes
    pub failed_refreshes: u64,
    /// Last successful refresh
    pub refreshed_at: DateTime<Utc>,
    /// Seconds since the last successful refresh
    pub age_seconds: i64,
    /// Whether the next read refreshes
    pub stale: bool,
}

impl From<CacheStats> for CacheStatsDto {
    fn from(stats: CacheStats) -> Self {
        Self {
            domains: stats.domains,
            refreshes: stats.refreshes,
            failed_refreshes: stats.failed_refreshes,
            refreshed_at: stats.refreshed_at,
            age_seconds: stats.age_seconds,
            stale: stats.stale,
        }
    }
}

/// GET /api/v1/domains
#[derive(Debug, Serialize, Deserialize)]
pub struct DomainsResponse {
    /// Verified domains in upstream order
    pub domains: Vec<String>,
    /// Number of domains
    pub count: usize,
    /// When the served list was fetched
    pub refreshed_at: DateTime<Utc>,
}

/// GET /api/v1/domains/:domain
#[derive(Debug, Serialize, Deserialize)]
pub struct DomainCheckResponse {
    /// Domain as requested
    pub domain: String,
    /// Whether it is on the allowlist
    pub verified: bool,
}
