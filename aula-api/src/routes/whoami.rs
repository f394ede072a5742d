//! Identity echo endpoint.
//!
//! Returns the verified context the gate attached to the request. Also
//! serves as the reference for how handlers consume [`VerifiedOrg`].

use axum::Json;
use serde::Serialize;

use crate::middleware::VerifiedOrg;

#[derive(Debug, Serialize)]
pub struct WhoamiResponse {
    pub user_id: String,
    pub organization_id: String,
    pub role: String,
    pub org_source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// GET /api/v1/whoami
pub async fn whoami(auth: VerifiedOrg) -> Json<WhoamiResponse> {
    Json(WhoamiResponse {
        user_id: auth.user_id.clone(),
        organization_id: auth.organization_id.to_string(),
        role: auth.role.to_string(),
        org_source: auth.org_source.as_str(),
        email: auth.email.clone(),
    })
}
