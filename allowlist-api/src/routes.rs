//! API route configuration.

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::handlers;
use crate::state::AppState;

/// Creates the API router with all routes configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))

        // Verified domains
        .route("/api/v1/domains", get(handlers::list_domains))
        .route("/api/v1/domains/:domain", get(handlers::check_domain))

        .with_state(state)
}
