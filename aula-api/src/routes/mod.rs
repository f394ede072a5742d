//! Route registration.

pub mod cache_admin;
pub mod health;
pub mod session;
pub mod whoami;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::{authorization_gate, GateState};
use crate::state::AppState;
use crate::telemetry::metrics::{metrics_handler, track_requests};

/// Build the full application router with the authorization gate applied.
///
/// The gate layer wraps every route; exempt paths are filtered inside
/// the middleware so the exemption list stays in one place.
pub fn create_router(state: AppState, gate: GateState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(metrics_handler))
        .route("/api/v1/whoami", get(whoami::whoami))
        .route("/api/v1/cache/stats", get(cache_admin::stats))
        .route("/api/v1/cache/flush", post(cache_admin::flush))
        .route(
            "/api/v1/sessions/:session_id",
            put(session::put_session)
                .get(session::get_session)
                .delete(session::delete_session),
        )
        .layer(middleware::from_fn_with_state(gate, authorization_gate))
        .layer(middleware::from_fn(track_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
