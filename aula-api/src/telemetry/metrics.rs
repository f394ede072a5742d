//! Prometheus metrics for the gateway.
//!
//! Defines gateway metrics and exposes a /metrics endpoint for scraping.

use axum::{
    extract::Request, http::StatusCode, middleware::Next, response::IntoResponse,
    response::Response,
};
use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, CounterVec, Encoder, TextEncoder};

use crate::error::{ApiError, ApiResult};

/// Global metrics instance - initialized once at startup.
pub static METRICS: Lazy<ApiResult<GateMetrics>> = Lazy::new(GateMetrics::new);

/// Container for gateway metrics.
#[derive(Clone)]
pub struct GateMetrics {
    /// Gate decisions by outcome (granted, denied, failed_closed).
    pub gate_decisions_total: CounterVec,

    /// HTTP requests by method, path, and status.
    pub http_requests_total: CounterVec,
}

impl GateMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            gate_decisions_total: register_counter_vec!(
                "aula_gate_decisions_total",
                "Total number of authorization gate decisions",
                &["decision"]
            )
            .map_err(|e| {
                ApiError::internal_error(format!("Failed to register gate_decisions_total: {}", e))
            })?,

            http_requests_total: register_counter_vec!(
                "aula_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| {
                ApiError::internal_error(format!("Failed to register http_requests_total: {}", e))
            })?,
        })
    }
}

/// Record one gate decision. Registration failures are reported at
/// startup; here they silently drop the sample.
pub fn record_gate_decision(decision: &str) {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics
            .gate_decisions_total
            .with_label_values(&[decision])
            .inc();
    }
}

/// Middleware recording one `http_requests_total` sample per request.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    if let Ok(metrics) = METRICS.as_ref() {
        metrics
            .http_requests_total
            .with_label_values(&[&method, &path, response.status().as_str()])
            .inc();
    }
    response
}

/// Handler for the /metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", encoder.format_type().to_string())],
            buffer,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
