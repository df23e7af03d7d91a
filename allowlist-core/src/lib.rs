//! # Allowlist Core
//!
//! Core types, errors, and traits for the Fediseer verified-domain allowlist.
//!
//! This crate provides the building blocks used by the other allowlist crates:
//!
//! - **Types**: [`Allowlist`] and the [`RefreshParameters`] sent upstream
//! - **Errors**: [`FetchError`] for a single fetch, [`AllowlistError`] for everything else
//! - **Constants**: Endpoint, defaults, and environment keys
//! - **Traits**: [`AllowlistFetcher`] and [`Clock`], the seams used for testing
//! - **Config**: [`AllowlistConfig`] resolved from the environment
//!
//! ## Example
//!
//! ```rust
//! use allowlist_core::{Allowlist, AllowlistConfig};
//!
//! let allowlist = Allowlist::from_domains(vec!["lemmy.world".into(), "lemmy.world".into()]);
//! assert_eq!(allowlist.len(), 1);
//!
//! let params = AllowlistConfig::default().refresh_parameters();
//! assert_eq!(params.software, "lemmy");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod config;
pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use config::AllowlistConfig;
pub use constants::*;
pub use error::{AllowlistError, ErrorKind, FetchError, Result};
pub use traits::*;
pub use types::*;
