//! Membership verification.
//!
//! The last authorization step: is this user an active member of the
//! organization the request targets? The two failure modes are kept
//! apart because they answer differently: a definitive "not a member"
//! is a 403, while an unreachable membership service fails closed as a
//! server error. An outage must never widen access.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use aula_core::OrgId;

/// Definitive answer from the membership service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipStatus {
    /// The user is an active member of the organization.
    Active,
    /// The user is not a member, or the membership is suspended.
    NotActive,
}

/// The membership question could not be answered.
#[derive(Debug, thiserror::Error)]
pub enum MembershipError {
    #[error("membership service unreachable: {0}")]
    Unreachable(String),
}

/// Answers whether a user belongs to an organization.
#[async_trait]
pub trait MembershipVerifier: Send + Sync {
    async fn verify(
        &self,
        user_id: &str,
        org: OrgId,
    ) -> Result<MembershipStatus, MembershipError>;
}

/// Wire format of a membership record: status is one of `active`,
/// `suspended`, or `revoked`. Only `active` authorizes access.
#[derive(Debug, Deserialize)]
struct MembershipWire {
    #[serde(default)]
    status: String,
}

/// HTTP client for the membership service.
#[derive(Debug, Clone)]
pub struct HttpMembershipVerifier {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMembershipVerifier {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl MembershipVerifier for HttpMembershipVerifier {
    async fn verify(
        &self,
        user_id: &str,
        org: OrgId,
    ) -> Result<MembershipStatus, MembershipError> {
        let url = format!(
            "{}/api/v1/organizations/{}/members/{}",
            self.base_url, org, user_id
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| MembershipError::Unreachable(e.to_string()))?;

        // Any definitive non-success answer means "not a member". Only
        // transport failures and 5xx responses count as outages.
        let status = response.status();
        if status.is_server_error() {
            return Err(MembershipError::Unreachable(format!(
                "membership service returned {}",
                status
            )));
        }
        if !status.is_success() {
            return Ok(MembershipStatus::NotActive);
        }

        let wire: MembershipWire = response
            .json()
            .await
            .map_err(|e| MembershipError::Unreachable(e.to_string()))?;

        if wire.status == "active" {
            Ok(MembershipStatus::Active)
        } else {
            Ok(MembershipStatus::NotActive)
        }
    }
}
