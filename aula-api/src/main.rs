//! AULA gateway binary.

use std::sync::Arc;

use aula_api::audit::TracingAuditLogger;
use aula_api::identity::HttpIdentityResolver;
use aula_api::membership::HttpMembershipVerifier;
use aula_api::routes::create_router;
use aula_api::telemetry;
use aula_api::token::{SystemClock, TokenVerifier};
use aula_api::{ApiError, AppState, GateState, GatewayConfig};
use aula_cache::{MemoryKvStore, TenantCache};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_tracing();

    let config = GatewayConfig::from_env();
    config.auth.validate_for_production()?;

    if let Err(e) = aula_api::telemetry::metrics::METRICS.as_ref() {
        tracing::error!(error = %e, "metrics registration failed, continuing without metrics");
    }

    let verifier = TokenVerifier::new(
        config.auth.jwt_secret.clone(),
        config.auth.jwt_leeway_secs,
        Arc::new(SystemClock),
    );

    let identity = HttpIdentityResolver::new(&config.identity_base_url, config.upstream_timeout)
        .map_err(|e| ApiError::internal_error(format!("identity client: {}", e)))?;
    let membership =
        HttpMembershipVerifier::new(&config.membership_base_url, config.upstream_timeout)
            .map_err(|e| ApiError::internal_error(format!("membership client: {}", e)))?;

    let gate = GateState::new(
        verifier,
        Arc::new(identity),
        Arc::new(membership),
        Arc::new(TracingAuditLogger),
    );

    // TenantCache only sees the KeyValueStore trait; the in-memory
    // store here stands in for the deployment's shared store.
    let cache = TenantCache::with_default_ttl(
        Arc::new(MemoryKvStore::new()),
        std::time::Duration::from_secs(config.cache_default_ttl_secs),
    );
    let state = AppState::new(cache);

    let app = create_router(state, gate);

    tracing::info!(addr = %config.bind_addr, "starting aula-api");
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install shutdown handler");
        return;
    }
    tracing::info!("shutdown signal received, draining connections");
}
