//! Cache administration endpoints.
//!
//! Stats are visible to roles with the audit action; flushing a whole
//! organization's cache requires the manage action. Both operate only
//! on the caller's verified organization, never on an id taken from
//! the request.

use axum::{extract::State, Json};
use serde::Serialize;

use aula_core::Action;

use crate::error::{ApiError, ApiResult};
use crate::middleware::VerifiedOrg;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CacheStatsResponse {
    pub organization_id: String,
    pub entries: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

/// GET /api/v1/cache/stats
pub async fn stats(
    State(state): State<AppState>,
    auth: VerifiedOrg,
) -> ApiResult<Json<CacheStatsResponse>> {
    if !auth.can(Action::Audit) {
        return Err(ApiError::forbidden("Cache statistics require audit access"));
    }

    let stats = state.cache.stats_for(auth.organization_id).await;
    Ok(Json(CacheStatsResponse {
        organization_id: auth.organization_id.to_string(),
        entries: stats.entries,
        hits: stats.hits,
        misses: stats.misses,
        hit_rate: stats.hit_rate(),
    }))
}

#[derive(Debug, Serialize)]
pub struct FlushResponse {
    pub organization_id: String,
    pub entries_removed: u64,
}

/// POST /api/v1/cache/flush
pub async fn flush(
    State(state): State<AppState>,
    auth: VerifiedOrg,
) -> ApiResult<Json<FlushResponse>> {
    if !auth.can(Action::Manage) {
        return Err(ApiError::forbidden("Cache flush requires manage access"));
    }

    let org = auth.organization_id.to_string();
    let removed = state.cache.flush_organization(&org).await;
    tracing::info!(
        organization_id = %org,
        user_id = %auth.user_id,
        entries_removed = removed,
        "organization cache flushed"
    );

    Ok(Json(FlushResponse {
        organization_id: org,
        entries_removed: removed,
    }))
}
