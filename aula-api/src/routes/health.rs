//! Health check endpoint. Exempt from the authorization gate.

use axum::{response::IntoResponse, Json};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "aula-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
