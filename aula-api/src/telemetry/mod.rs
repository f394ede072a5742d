//! Telemetry: structured logging and Prometheus metrics.

pub mod metrics;

use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber.
///
/// `AULA_LOG` controls the filter (default `info`); `AULA_LOG_FORMAT=json`
/// switches to JSON output for log aggregation.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("AULA_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info,aula_api=debug"));

    let json = std::env::var("AULA_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
