//! Domain types for the allowlist.
//!
//! - [`Allowlist`]: Ordered, de-duplicated set of verified domains
//! - [`RefreshParameters`]: What the cache asks the upstream for on every refresh

mod allowlist;
mod params;

pub use allowlist::*;
pub use params::*;
