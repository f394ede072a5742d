//! Gateway configuration.
//!
//! Everything is environment-driven with development defaults. Startup
//! calls [`AuthConfig::validate_for_production`] so an insecure secret
//! can never reach a production deployment silently.

use std::time::Duration;

use crate::error::{ApiError, ApiResult};
use crate::token::JwtSecret;

const MIN_PRODUCTION_SECRET_LEN: usize = 32;

/// Authentication configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// JWT secret key for signing and verification.
    pub jwt_secret: JwtSecret,

    /// Clock skew tolerance in seconds when validating exp/nbf.
    pub jwt_leeway_secs: i64,

    /// Lifetime of tokens issued by this service, in seconds.
    pub jwt_expiration_secs: i64,
}

impl AuthConfig {
    /// Load from `AULA_JWT_SECRET`, `AULA_JWT_LEEWAY_SECS`, and
    /// `AULA_JWT_EXPIRATION_SECS`. Missing values get development
    /// defaults.
    pub fn from_env() -> Self {
        let jwt_secret = std::env::var("AULA_JWT_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .and_then(|s| JwtSecret::new(s).ok())
            .unwrap_or_else(JwtSecret::insecure_default);

        Self {
            jwt_secret,
            jwt_leeway_secs: env_i64("AULA_JWT_LEEWAY_SECS", 60),
            jwt_expiration_secs: env_i64("AULA_JWT_EXPIRATION_SECS", 3600),
        }
    }

    /// Refuse to start in production with an insecure or short secret.
    /// In development the problems are logged as warnings instead.
    pub fn validate_for_production(&self) -> ApiResult<()> {
        let environment = std::env::var("AULA_ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase();
        let is_production = environment == "production" || environment == "prod";

        if self.jwt_secret.is_insecure_default() {
            if is_production {
                return Err(ApiError::internal_error(
                    "AULA_JWT_SECRET is the insecure default; set a real secret",
                ));
            }
            tracing::warn!("using the insecure default JWT secret (development only)");
        }

        if self.jwt_secret.len() < MIN_PRODUCTION_SECRET_LEN {
            if is_production {
                return Err(ApiError::internal_error(format!(
                    "AULA_JWT_SECRET must be at least {} characters",
                    MIN_PRODUCTION_SECRET_LEN
                )));
            }
            tracing::warn!(
                len = self.jwt_secret.len(),
                "JWT secret is shorter than recommended"
            );
        }

        Ok(())
    }
}

/// Top-level gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: String,

    /// Base URL of the identity service.
    pub identity_base_url: String,

    /// Base URL of the membership service.
    pub membership_base_url: String,

    /// Timeout for calls to backing services.
    pub upstream_timeout: Duration,

    /// Default TTL for cache entries, in seconds.
    pub cache_default_ttl_secs: u64,

    pub auth: AuthConfig,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("AULA_BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            identity_base_url: std::env::var("AULA_IDENTITY_URL")
                .unwrap_or_else(|_| "http://localhost:8081".to_string()),
            membership_base_url: std::env::var("AULA_MEMBERSHIP_URL")
                .unwrap_or_else(|_| "http://localhost:8082".to_string()),
            upstream_timeout: Duration::from_secs(env_i64("AULA_UPSTREAM_TIMEOUT_SECS", 3) as u64),
            cache_default_ttl_secs: env_i64("AULA_CACHE_TTL_SECS", 3600) as u64,
            auth: AuthConfig::from_env(),
        }
    }
}

fn env_i64(name: &str, default: i64) -> i64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_secret_is_flagged() {
        let config = AuthConfig {
            jwt_secret: JwtSecret::insecure_default(),
            jwt_leeway_secs: 60,
            jwt_expiration_secs: 3600,
        };
        assert!(config.jwt_secret.is_insecure_default());
        // Development mode: warn but pass.
        assert!(config.validate_for_production().is_ok());
    }

    #[test]
    fn strong_secret_passes() {
        let config = AuthConfig {
            jwt_secret: JwtSecret::new("0123456789abcdef0123456789abcdef".to_string()).unwrap(),
            jwt_leeway_secs: 60,
            jwt_expiration_secs: 3600,
        };
        assert!(config.validate_for_production().is_ok());
    }
}
