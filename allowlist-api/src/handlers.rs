//! API route handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::debug;

use crate::dto::*;
use crate::error::ApiError;
use crate::state::AppState;

type Result<T> = std::result::Result<T, ApiError>;

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        filter_enabled: state.config.allowlist.filter_verified_domains,
        cache: state.cache.as_ref().map(|c| CacheStatsDto::from(c.stats())),
    })
}

/// GET /api/v1/domains
pub async fn list_domains(State(state): State<Arc<AppState>>) -> Result<Json<DomainsResponse>> {
    let cache = state.cache.as_ref().ok_or_else(ApiError::filter_disabled)?;

    let snapshot = cache.get_snapshot().await;

    Ok(Json(DomainsResponse {
        count: snapshot.allowlist.len(),
        domains: snapshot.allowlist.to_vec(),
        refreshed_at: snapshot.refreshed_at,
    }))
}

/// GET /api/v1/domains/:domain
pub async fn check_domain(
    State(state): State<Arc<AppState>>,
    Path(domain): Path<String>,
) -> Result<Json<DomainCheckResponse>> {
    let cache = state.cache.as_ref().ok_or_else(ApiError::filter_disabled)?;

    let verified = cache.get_domains().await.contains(&domain);
    debug!(domain = %domain, verified, "Checked domain");

    Ok(Json(DomainCheckResponse { domain, verified }))
}
