//! Identity resolution.
//!
//! After a token's signature and lifetime check out, the gate confirms
//! the subject against the identity service. Token claims alone never
//! establish who the caller is; a revoked or deleted user fails here
//! even with a valid token.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use aula_core::{OrgId, Role};

/// An active user as reported by the identity service.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: String,
    pub email: Option<String>,
    pub role: Role,
    /// Home organization, when the identity service tracks one.
    pub organization_id: Option<OrgId>,
}

/// Why identity resolution failed.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The subject does not exist or is deactivated. Maps to 401.
    #[error("user not found or inactive")]
    NotFound,

    /// The identity service could not be reached. Fails closed as a
    /// server error; without a confirmed identity nothing is granted.
    #[error("identity service unreachable: {0}")]
    Unreachable(String),
}

/// Resolves a token subject to an active user.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, user_id: &str) -> Result<UserRecord, IdentityError>;
}

/// Wire format of the identity service's user endpoint.
#[derive(Debug, Deserialize)]
struct UserWire {
    id: String,
    email: Option<String>,
    role: Option<String>,
    organization_id: Option<String>,
    #[serde(default = "default_active")]
    active: bool,
}

fn default_active() -> bool {
    true
}

/// HTTP client for the identity service.
#[derive(Debug, Clone)]
pub struct HttpIdentityResolver {
    client: reqwest::Client,
    base_url: String,
}

impl HttpIdentityResolver {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl IdentityResolver for HttpIdentityResolver {
    async fn resolve(&self, user_id: &str) -> Result<UserRecord, IdentityError> {
        let url = format!("{}/api/v1/users/{}", self.base_url, user_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| IdentityError::Unreachable(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(IdentityError::NotFound);
        }
        if !response.status().is_success() {
            return Err(IdentityError::Unreachable(format!(
                "identity service returned {}",
                response.status()
            )));
        }

        let wire: UserWire = response
            .json()
            .await
            .map_err(|e| IdentityError::Unreachable(e.to_string()))?;

        if !wire.active {
            return Err(IdentityError::NotFound);
        }

        // Unknown or absent roles downgrade to the least-privileged role
        // rather than failing the request.
        let role = wire
            .role
            .as_deref()
            .and_then(|r| Role::from_str(r).ok())
            .unwrap_or_default();

        let organization_id = wire
            .organization_id
            .as_deref()
            .and_then(|raw| OrgId::parse(raw).ok());

        Ok(UserRecord {
            id: wire.id,
            email: wire.email,
            role,
            organization_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_role_downgrades_to_student() {
        let wire: UserWire = serde_json::from_str(
            r#"{"id": "u1", "email": null, "role": "superuser", "organization_id": null}"#,
        )
        .unwrap();
        let role = wire
            .role
            .as_deref()
            .and_then(|r| Role::from_str(r).ok())
            .unwrap_or_default();
        assert_eq!(role, Role::Student);
    }

    #[test]
    fn wire_defaults_active_when_absent() {
        let wire: UserWire =
            serde_json::from_str(r#"{"id": "u1", "email": null, "role": "admin"}"#).unwrap();
        assert!(wire.active);
    }
}
