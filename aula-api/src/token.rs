//! JWT verification.
//!
//! Tokens are verified in two phases: `jsonwebtoken` checks the signature
//! only, then we validate `exp`/`nbf` ourselves against an injected clock.
//! Owning time validation keeps tests deterministic and avoids the
//! pre-epoch panic path inside the library.

use std::sync::Arc;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use aula_core::Role;

use crate::error::{ApiError, ApiResult, ErrorCode};

/// Clock abstraction for JWT time validation.
pub trait JwtClock: Send + Sync {
    /// Current time as Unix epoch seconds.
    fn now_epoch_secs(&self) -> i64;
}

/// Production clock using system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl JwtClock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Fixed clock for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl JwtClock for FixedClock {
    fn now_epoch_secs(&self) -> i64 {
        self.0
    }
}

const INSECURE_DEFAULT: &str = "INSECURE_DEFAULT_SECRET_CHANGE_IN_PRODUCTION";

/// Type-safe JWT secret that prevents accidental logging.
#[derive(Clone)]
pub struct JwtSecret(SecretString);

impl JwtSecret {
    /// Create a new JWT secret with validation.
    ///
    /// # Errors
    /// Returns error if the secret is empty.
    pub fn new(secret: String) -> ApiResult<Self> {
        if secret.is_empty() {
            return Err(ApiError::internal_error("jwt secret must not be empty"));
        }
        Ok(Self(SecretString::new(secret.into())))
    }

    /// The insecure development default.
    pub fn insecure_default() -> Self {
        Self(SecretString::new(INSECURE_DEFAULT.to_string().into()))
    }

    /// Expose the secret for signing/verification.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Length in bytes, for diagnostics.
    pub fn len(&self) -> usize {
        self.0.expose_secret().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if the secret is the insecure default.
    pub fn is_insecure_default(&self) -> bool {
        self.0.expose_secret() == INSECURE_DEFAULT
    }
}

impl std::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JwtSecret([REDACTED, {} chars])", self.len())
    }
}

/// JWT claims carried by platform tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: String,

    /// Issued-at, Unix epoch seconds.
    pub iat: i64,

    /// Expiration, Unix epoch seconds.
    pub exp: i64,

    /// Not-before, Unix epoch seconds. Optional.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Role name asserted by the issuer. Kept as a plain string: the
    /// gate takes the authoritative role from the identity service, so
    /// an unknown name here must not fail token decoding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Verifies bearer tokens against a shared secret and an injected clock.
#[derive(Clone)]
pub struct TokenVerifier {
    secret: JwtSecret,
    algorithm: Algorithm,
    leeway_secs: i64,
    clock: Arc<dyn JwtClock>,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("secret", &self.secret)
            .field("algorithm", &self.algorithm)
            .field("leeway_secs", &self.leeway_secs)
            .field("clock", &"<JwtClock>")
            .finish()
    }
}

impl TokenVerifier {
    pub fn new(secret: JwtSecret, leeway_secs: i64, clock: Arc<dyn JwtClock>) -> Self {
        Self {
            secret,
            algorithm: Algorithm::HS256,
            leeway_secs,
            clock,
        }
    }

    /// Strip the `Bearer ` scheme from an Authorization header value.
    pub fn bearer_token(header_value: &str) -> ApiResult<&str> {
        header_value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ApiError::invalid_token("Authorization header must use Bearer scheme")
            })
    }

    /// Validate a JWT and extract its claims.
    ///
    /// Signature validation only in the decode step; exp/nbf are checked
    /// against our clock with the configured leeway.
    pub fn verify(&self, token: &str) -> ApiResult<Claims> {
        let decoding_key = DecodingKey::from_secret(self.secret.expose().as_bytes());

        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.required_spec_claims = std::collections::HashSet::from(["exp".to_string()]);

        // The specific decode failure goes to the log; the caller sees
        // one generic message for every invalid token.
        let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
            tracing::debug!(error = %e, "token decode failed");
            ApiError::from_code(ErrorCode::InvalidToken)
        })?;

        let claims = token_data.claims;
        let now = self.clock.now_epoch_secs();

        if now < 0 {
            tracing::error!(
                timestamp = now,
                "system clock returned pre-epoch time, refusing to validate tokens"
            );
            return Err(ApiError::internal_error("server clock is invalid"));
        }

        if let Some(nbf) = claims.nbf {
            if now + self.leeway_secs < nbf {
                tracing::debug!(nbf, now, "token not yet valid");
                return Err(ApiError::from_code(ErrorCode::InvalidToken));
            }
        }

        if claims.exp < now - self.leeway_secs {
            return Err(ApiError::token_expired());
        }

        Ok(claims)
    }

    /// Sign a token for a user. Used by test fixtures.
    pub fn issue(&self, user_id: &str, role: Role, expiration_secs: i64) -> ApiResult<String> {
        let now = self.clock.now_epoch_secs();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now,
            exp: now + expiration_secs,
            nbf: None,
            role: Some(role.as_str().to_string()),
            email: None,
        };
        encode(
            &Header::new(self.algorithm),
            &claims,
            &EncodingKey::from_secret(self.secret.expose().as_bytes()),
        )
        .map_err(|e| ApiError::internal_error(format!("Failed to sign token: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn verifier_at(now: i64) -> TokenVerifier {
        TokenVerifier::new(
            JwtSecret::new("test_secret_for_token_module_0000".to_string()).unwrap(),
            60,
            Arc::new(FixedClock(now)),
        )
    }

    #[test]
    fn issue_then_verify_round_trips() {
        let verifier = verifier_at(1_700_000_000);
        let token = verifier.issue("user-1", Role::Instructor, 3600).unwrap();
        let claims = verifier.verify(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.role.as_deref(), Some("instructor"));
        assert_eq!(claims.exp, 1_700_000_000 + 3600);
    }

    #[test]
    fn expired_token_is_rejected_with_expired_code() {
        let issuer = verifier_at(1_700_000_000);
        let token = issuer.issue("user-1", Role::Student, 60).unwrap();

        // Two hours later, well past leeway.
        let later = verifier_at(1_700_000_000 + 7200);
        let err = later.verify(&token).unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenExpired);
    }

    #[test]
    fn leeway_tolerates_slightly_expired_tokens() {
        let issuer = verifier_at(1_700_000_000);
        let token = issuer.issue("user-1", Role::Student, 60).unwrap();

        // 30 seconds past exp, inside the 60 second leeway.
        let later = verifier_at(1_700_000_000 + 90);
        assert!(later.verify(&token).is_ok());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let issuer = verifier_at(1_700_000_000);
        let token = issuer.issue("user-1", Role::Student, 3600).unwrap();

        let other = TokenVerifier::new(
            JwtSecret::new("a_completely_different_secret_000".to_string()).unwrap(),
            60,
            Arc::new(FixedClock(1_700_000_000)),
        );
        let err = other.verify(&token).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidToken);
    }

    #[test]
    fn garbage_token_is_rejected() {
        let verifier = verifier_at(1_700_000_000);
        assert!(verifier.verify("not.a.jwt").is_err());
        assert!(verifier.verify("").is_err());
    }

    #[test]
    fn decode_failures_carry_only_the_generic_message() {
        let verifier = verifier_at(1_700_000_000);
        for garbage in ["not.a.jwt", "a.%%%.c", "Bearer", ""] {
            let err = verifier.verify(garbage).unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidToken);
            assert_eq!(err.message, ErrorCode::InvalidToken.default_message());
            assert_eq!(err.details, None);
        }
    }

    #[test]
    fn bearer_scheme_is_required() {
        assert!(TokenVerifier::bearer_token("Bearer abc").is_ok());
        assert!(TokenVerifier::bearer_token("bearer abc").is_err());
        assert!(TokenVerifier::bearer_token("Basic abc").is_err());
        assert!(TokenVerifier::bearer_token("Bearer ").is_err());
    }

    #[test]
    fn secret_debug_is_redacted() {
        let secret = JwtSecret::new("super_secret_value".to_string()).unwrap();
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("super_secret_value"));
        assert!(debug.contains("REDACTED"));
    }
}
