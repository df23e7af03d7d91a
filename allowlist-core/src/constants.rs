//! Constants for the verified-domain allowlist.
//!
//! Defaults mirror the values the exporter has always shipped with, so an
//! unconfigured deployment queries Fediseer exactly like before.

// ═══════════════════════════════════════════════════════════════════════════════
// UPSTREAM
// ═══════════════════════════════════════════════════════════════════════════════

/// Fediseer whitelist endpoint.
pub const FEDISEER_WHITELIST_URL: &str = "https://fediseer.com/api/v1/whitelist";

/// User agent sent with every upstream request unless overridden.
pub const DEFAULT_USER_AGENT: &str =
    "Lemmy-Federation-Exporter (+https://github.com/Nothing4You/lemmy-federation-exporter)";

/// Software filter sent as `software_csv`. Only Lemmy instances qualify.
pub const SOFTWARE_FILTER: &str = "lemmy";

/// Total request timeout for one whitelist fetch, in seconds.
pub const FETCH_TIMEOUT_SECS: u64 = 10;

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE POLICY
// ═══════════════════════════════════════════════════════════════════════════════

/// Age after which cached domains are refreshed on the next read (10 minutes).
pub const STALENESS_THRESHOLD_SECS: u64 = 600;

/// Default minimum number of endorsements a domain needs.
pub const DEFAULT_ENDORSEMENTS: u32 = 2;

/// Default minimum number of guarantors a domain needs.
pub const DEFAULT_GUARANTORS: u32 = 1;

/// Default maximum number of domains returned by Fediseer.
pub const DEFAULT_RETURN_LIMIT: u32 = 100;

// ═══════════════════════════════════════════════════════════════════════════════
// ENVIRONMENT KEYS
// ═══════════════════════════════════════════════════════════════════════════════

/// User agent override.
pub const ENV_HTTP_USER_AGENT: &str = "HTTP_USER_AGENT";

/// Enables the verified-domain filter in the export layer.
pub const ENV_FILTER_VERIFIED_DOMAINS: &str = "FILTER_VERIFIED_DOMAINS";

/// Minimum endorsements.
pub const ENV_FILTER_VERIFIED_ENDORSEMENTS: &str = "FILTER_VERIFIED_ENDORSEMENTS";

/// Minimum guarantors.
pub const ENV_FILTER_VERIFIED_GUARANTORS: &str = "FILTER_VERIFIED_GUARANTORS";

/// Result limit.
pub const ENV_FILTER_VERIFIED_RETURN_LIMIT: &str = "FILTER_VERIFIED_RETURN_LIMIT";

/// Whitelist endpoint override.
pub const ENV_FEDISEER_WHITELIST_URL: &str = "FEDISEER_WHITELIST_URL";
