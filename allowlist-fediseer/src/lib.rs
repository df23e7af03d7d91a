//! Fediseer client for fetching the verified-domain allowlist.
//!
//! Queries the Fediseer whitelist endpoint for Lemmy instances with enough
//! endorsements and guarantors, asking for the flat `domains` list.

mod client;

pub use client::{whitelist_query, FediseerClient, FediseerConfig};
