//! Self-refreshing cache for the verified-domain allowlist.
//!
//! Holds one allowlist in memory and refreshes it from an
//! [`AllowlistFetcher`](allowlist_core::AllowlistFetcher) once it is older
//! than the staleness threshold. A failed refresh keeps serving the last good
//! list.

mod cache;

pub use cache::{CacheSnapshot, CacheStats, VerifiedDomainCache};
