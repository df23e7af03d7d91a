//! # Allowlist API Server
//!
//! HTTP surface for the verified-domain allowlist, consumed by the export
//! layer that filters remote instances.
//!
//! ## Endpoints
//!
//! - `GET /health` - Liveness plus cache statistics
//! - `GET /api/v1/domains` - The cached allowlist
//! - `GET /api/v1/domains/:domain` - Whether one domain is verified
//!
//! ## Example
//!
//! ```rust,ignore
//! use allowlist_api::{ApiServer, ApiConfig};
//!
//! let server = ApiServer::new(ApiConfig::from_env()).await?;
//! server.run(([0, 0, 0, 0], 9100)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod dto;
mod error;
mod handlers;
mod routes;
mod state;

pub use dto::{CacheStatsDto, DomainCheckResponse, DomainsResponse, HealthResponse};
pub use error::ApiError;
pub use routes::create_router;
pub use state::{ApiConfig, AppState};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use allowlist_core::Result;

/// API server for the allowlist.
pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    /// Creates a server, populating the cache if filtering is enabled.
    pub async fn new(config: ApiConfig) -> Result<Self> {
        Ok(Self::with_state(AppState::new(config).await?))
    }

    /// Creates a server around prepared state.
    pub fn with_state(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Creates the router with all routes configured.
    pub fn router(&self) -> Router {
        create_router(self.state.clone()).layer(TraceLayer::new_for_http())
    }

    /// Runs the server on the given address.
    pub async fn run(self, addr: impl Into<SocketAddr>) -> std::io::Result<()> {
        let addr = addr.into();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!(
            filter_enabled = self.state.cache.is_some(),
            "Allowlist API server listening on {}", addr
        );

        axum::serve(listener, self.router()).await
    }
}
