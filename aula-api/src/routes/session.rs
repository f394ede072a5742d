//! Session endpoints backed by the entity cache.
//!
//! Sessions are short-lived, cache-resident state. The organization is
//! always the caller's verified one.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use aula_core::Action;

use crate::error::{ApiError, ApiResult};
use crate::middleware::VerifiedOrg;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub course_id: String,
    #[serde(default)]
    pub progress_pct: u8,
}

/// PUT /api/v1/sessions/:session_id
pub async fn put_session(
    State(state): State<AppState>,
    auth: VerifiedOrg,
    Path(session_id): Path<String>,
    Json(session): Json<Session>,
) -> ApiResult<Json<Session>> {
    if !auth.can(Action::Write) {
        return Err(ApiError::forbidden("Writing sessions requires write access"));
    }

    let org = auth.organization_id.to_string();
    if !state.entities.cache_session(&org, &session_id, &session).await {
        // Fail-soft cache: the write did not stick, but the request is
        // still well-formed. Surface it so the client can retry.
        return Err(ApiError::internal_error("Session could not be stored"));
    }

    Ok(Json(session))
}

/// GET /api/v1/sessions/:session_id
pub async fn get_session(
    State(state): State<AppState>,
    auth: VerifiedOrg,
    Path(session_id): Path<String>,
) -> ApiResult<Json<Session>> {
    let org = auth.organization_id.to_string();
    state
        .entities
        .get_session::<Session>(&org, &session_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Session {} not found", session_id)))
}

/// DELETE /api/v1/sessions/:session_id
pub async fn delete_session(
    State(state): State<AppState>,
    auth: VerifiedOrg,
    Path(session_id): Path<String>,
) -> ApiResult<()> {
    if !auth.can(Action::Write) {
        return Err(ApiError::forbidden("Deleting sessions requires write access"));
    }

    let org = auth.organization_id.to_string();
    if state.entities.evict_session(&org, &session_id).await {
        Ok(())
    } else {
        Err(ApiError::not_found(format!(
            "Session {} not found",
            session_id
        )))
    }
}
