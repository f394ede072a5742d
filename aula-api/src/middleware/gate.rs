//! The authorization gate.
//!
//! Every non-exempt request passes through this middleware before any
//! handler runs. The gate:
//! 1. Checks the path against the exemption list
//! 2. Extracts and verifies the bearer token
//! 3. Confirms the token subject against the identity service
//! 4. Resolves the target organization (header, path, query, body)
//! 5. Verifies the user's membership in that organization
//! 6. Emits exactly one security audit event
//! 7. Injects [`VerifiedContext`] into request extensions on success
//!
//! Denials return 401/403/400; an identity or membership service outage
//! fails closed with a 500. Handlers never see a request whose
//! organization context has not been verified.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, Method},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use serde_json::Value;

use aula_core::{Action, OrgId, Role};

use crate::audit::{SecurityAction, SecurityAuditLogger, SecurityEvent};
use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::identity::{IdentityError, IdentityResolver};
use crate::membership::{MembershipError, MembershipStatus, MembershipVerifier};
use crate::org_resolver::{self, OrgIdSource};
use crate::telemetry::metrics;
use crate::token::TokenVerifier;

/// Paths that bypass the gate. An entry ending in `/` matches as a
/// prefix; anything else must match exactly.
pub const DEFAULT_EXEMPT_PATHS: &[&str] = &[
    "/health",
    "/metrics",
    "/docs/",
    "/openapi.json",
    "/redoc",
    "/api/v1/auth/login",
    "/api/v1/auth/register",
    "/api/v1/auth/refresh",
];

/// Largest JSON body the gate will buffer while looking for an
/// organization id.
const MAX_BUFFERED_BODY_BYTES: usize = 256 * 1024;

/// Shared state for the authorization gate.
///
/// All collaborators are injected; nothing here reads globals, so tests
/// swap in static resolvers and a recording audit sink.
#[derive(Clone)]
pub struct GateState {
    pub verifier: TokenVerifier,
    pub identity: Arc<dyn IdentityResolver>,
    pub membership: Arc<dyn MembershipVerifier>,
    pub audit: Arc<dyn SecurityAuditLogger>,
    pub exempt_paths: Arc<Vec<String>>,
}

impl GateState {
    pub fn new(
        verifier: TokenVerifier,
        identity: Arc<dyn IdentityResolver>,
        membership: Arc<dyn MembershipVerifier>,
        audit: Arc<dyn SecurityAuditLogger>,
    ) -> Self {
        Self {
            verifier,
            identity,
            membership,
            audit,
            exempt_paths: Arc::new(
                DEFAULT_EXEMPT_PATHS.iter().map(|p| p.to_string()).collect(),
            ),
        }
    }

    pub fn with_exempt_paths(mut self, paths: Vec<String>) -> Self {
        self.exempt_paths = Arc::new(paths);
        self
    }

    fn is_exempt(&self, path: &str) -> bool {
        self.exempt_paths.iter().any(|exempt| {
            if let Some(prefix) = exempt.strip_suffix('/') {
                path == prefix || path.starts_with(exempt.as_str())
            } else {
                path == exempt
            }
        })
    }
}

/// Authenticated, organization-verified request context.
///
/// Present in request extensions for every request the gate admitted.
/// Immutable after construction; handlers take the organization id from
/// here, never from raw request input.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedContext {
    pub user_id: String,
    pub organization_id: OrgId,
    pub role: Role,
    pub email: Option<String>,
    /// The full claim set of the presented token, for handlers that
    /// need issuer-specific fields.
    pub raw_claims: Value,
    pub org_source: OrgIdSource,
}

impl VerifiedContext {
    /// Whether the caller's role permits the action.
    pub fn can(&self, action: Action) -> bool {
        self.role.allows(action)
    }
}

/// Extract the verified context from a request. Handlers that take the
/// whole `Request` use this instead of the [`VerifiedOrg`] extractor.
pub fn verified_context(request: &Request) -> ApiResult<&VerifiedContext> {
    request
        .extensions()
        .get::<VerifiedContext>()
        .ok_or_else(|| ApiError::unauthorized("Verified context missing from request"))
}

/// Request metadata captured once and reused across audit events.
struct RequestMeta {
    endpoint: String,
    method: String,
    resource_type: Option<String>,
    resource_id: Option<String>,
    ip_address: Option<String>,
    user_agent: Option<String>,
}

impl RequestMeta {
    fn from_parts(parts: &Parts) -> Self {
        let endpoint = parts.uri.path().to_string();
        let (resource_type, resource_id) = resource_parts(&endpoint);
        Self {
            endpoint,
            method: parts.method.to_string(),
            resource_type,
            resource_id,
            ip_address: extract_client_ip(parts),
            user_agent: parts
                .headers
                .get("user-agent")
                .and_then(|h| h.to_str().ok())
                .map(str::to_string),
        }
    }

    fn event(
        &self,
        action: SecurityAction,
        user_id: &str,
        success: bool,
        reason: Option<&str>,
    ) -> SecurityEvent {
        let details = match reason {
            Some(reason) => format!("{} {}: {}", self.method, self.endpoint, reason),
            None => format!("{} {}", self.method, self.endpoint),
        };
        SecurityEvent {
            timestamp: Utc::now(),
            user_id: user_id.to_string(),
            organization_id: None,
            action,
            resource_type: self.resource_type.clone(),
            resource_id: self.resource_id.clone(),
            attempted_organization_id: None,
            success,
            details,
            ip_address: self.ip_address.clone(),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Split an API path into resource type and id: the first segment after
/// `/api/v1` names the resource, the next one identifies it.
fn resource_parts(path: &str) -> (Option<String>, Option<String>) {
    let rest = path.strip_prefix("/api/v1/").unwrap_or(path);
    let mut segments = rest.split('/').filter(|s| !s.is_empty());
    let resource_type = segments.next().map(str::to_string);
    let resource_id = segments.next().map(str::to_string);
    (resource_type, resource_id)
}

/// Extract client IP from proxy headers.
fn extract_client_ip(parts: &Parts) -> Option<String> {
    if let Some(forwarded_for) = parts
        .headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
    {
        if let Some(first_ip) = forwarded_for.split(',').next() {
            let trimmed = first_ip.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }

    parts
        .headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
}

/// Axum middleware enforcing the full authorization sequence.
pub async fn authorization_gate(
    State(state): State<GateState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if state.is_exempt(request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();
    let meta = RequestMeta::from_parts(&parts);

    // Step 1: bearer token.
    let token = match parts
        .headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .map(TokenVerifier::bearer_token)
    {
        Some(Ok(token)) => token.to_string(),
        Some(Err(err)) => {
            return Err(deny(&state, &meta, "anonymous", "malformed bearer token", err).await);
        }
        None => {
            return Err(deny(
                &state,
                &meta,
                "anonymous",
                "missing bearer token",
                ApiError::unauthorized("Authentication required: provide a bearer token"),
            )
            .await);
        }
    };

    // Step 2: signature and lifetime.
    let claims = match state.verifier.verify(&token) {
        Ok(claims) => claims,
        Err(err) => {
            let reason = if err.code == ErrorCode::TokenExpired {
                "expired token"
            } else {
                "invalid token"
            };
            return Err(deny(&state, &meta, "anonymous", reason, err).await);
        }
    };

    // Step 3: the subject must be an active user right now. A token
    // minted before a deactivation is not enough. The response is
    // byte-identical to the invalid-token denial so callers cannot
    // probe which accounts exist; the audit trail keeps the reasons
    // apart.
    let user = match state.identity.resolve(&claims.sub).await {
        Ok(user) => user,
        Err(IdentityError::NotFound) => {
            return Err(deny(
                &state,
                &meta,
                &claims.sub,
                "unknown or inactive identity",
                ApiError::from_code(ErrorCode::InvalidToken),
            )
            .await);
        }
        Err(IdentityError::Unreachable(cause)) => {
            tracing::error!(error = %cause, "identity service unreachable, failing closed");
            return Err(deny(
                &state,
                &meta,
                &claims.sub,
                "identity service unreachable",
                ApiError::upstream_unavailable("Identity verification unavailable"),
            )
            .await);
        }
    };

    let home_org = user.organization_id.map(|id| id.to_string());

    // Step 4: organization context. Header, path, and query need only
    // the request head; the body is buffered as a last resort for
    // JSON writes. A body that cannot be read is a terminal decision
    // and is audited like any other denial.
    let (parts, body, resolved) = match resolve_org(parts, body).await {
        Ok(result) => result,
        Err(err) => {
            let mut event = meta.event(
                SecurityAction::OrganizationAccess,
                &user.id,
                false,
                Some("unreadable request body"),
            );
            event.organization_id = home_org;
            state.audit.record(event).await;
            metrics::record_gate_decision("denied");
            return Err(err);
        }
    };

    let Some(resolved) = resolved else {
        let mut event = meta.event(
            SecurityAction::OrganizationAccess,
            &user.id,
            false,
            Some("no organization context"),
        );
        event.organization_id = home_org;
        state.audit.record(event).await;
        metrics::record_gate_decision("denied");
        return Err(ApiError::missing_organization());
    };

    // Step 5: membership, failing closed on outage.
    match state.membership.verify(&user.id, resolved.org).await {
        Ok(MembershipStatus::Active) => {}
        Ok(MembershipStatus::NotActive) => {
            let mut event = meta.event(
                SecurityAction::UnauthorizedAccessAttempt,
                &user.id,
                false,
                Some("not an active member"),
            );
            event.organization_id = home_org;
            event.attempted_organization_id = Some(resolved.org.to_string());
            state.audit.record(event).await;
            metrics::record_gate_decision("denied");
            return Err(ApiError::from_code(ErrorCode::Forbidden));
        }
        Err(MembershipError::Unreachable(cause)) => {
            tracing::error!(error = %cause, "membership service unreachable, failing closed");
            let mut event = meta.event(
                SecurityAction::OrganizationAccess,
                &user.id,
                false,
                Some("membership verification unavailable"),
            );
            event.organization_id = home_org;
            event.attempted_organization_id = Some(resolved.org.to_string());
            state.audit.record(event).await;
            metrics::record_gate_decision("failed_closed");
            return Err(ApiError::upstream_unavailable(
                "Membership verification unavailable",
            ));
        }
    }

    // Step 6: grant. One audit event, context into extensions.
    let mut event = meta.event(SecurityAction::OrganizationAccess, &user.id, true, None);
    event.organization_id = home_org;
    event.attempted_organization_id = Some(resolved.org.to_string());
    state.audit.record(event).await;
    metrics::record_gate_decision("granted");

    let raw_claims = serde_json::to_value(&claims).unwrap_or(Value::Null);
    let context = VerifiedContext {
        user_id: user.id,
        organization_id: resolved.org,
        role: user.role,
        email: user.email,
        raw_claims,
        org_source: resolved.source,
    };

    let mut request = Request::from_parts(parts, body);
    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}

/// Record a pre-membership denial and return the error to the client.
async fn deny(
    state: &GateState,
    meta: &RequestMeta,
    user_id: &str,
    reason: &str,
    err: ApiError,
) -> ApiError {
    let event = meta.event(
        SecurityAction::OrganizationAccess,
        user_id,
        false,
        Some(reason),
    );
    state.audit.record(event).await;
    metrics::record_gate_decision("denied");
    err
}

/// Try the extractor chain, buffering the body only when the head-based
/// extractors fail on a JSON write. The request body is reconstructed
/// byte-for-byte for the handler.
async fn resolve_org(
    parts: Parts,
    body: Body,
) -> ApiResult<(Parts, Body, Option<org_resolver::ResolvedOrg>)> {
    if let Some(resolved) = org_resolver::resolve(&parts, None) {
        return Ok((parts, body, Some(resolved)));
    }

    if !should_buffer_body(&parts) {
        return Ok((parts, body, None));
    }

    let bytes = to_bytes(body, MAX_BUFFERED_BODY_BYTES)
        .await
        .map_err(|_| ApiError::invalid_input("Request body could not be read"))?;

    let resolved = serde_json::from_slice::<Value>(&bytes)
        .ok()
        .as_ref()
        .and_then(|json| org_resolver::resolve(&parts, Some(json)));

    Ok((parts, Body::from(bytes), resolved))
}

fn should_buffer_body(parts: &Parts) -> bool {
    let is_write = matches!(parts.method, Method::POST | Method::PUT | Method::PATCH);
    if !is_write {
        return false;
    }

    let is_json = parts
        .headers
        .get("content-type")
        .and_then(|h| h.to_str().ok())
        .map(|ct| ct.starts_with("application/json"))
        .unwrap_or(false);
    if !is_json {
        return false;
    }

    parts
        .headers
        .get("content-length")
        .and_then(|h| h.to_str().ok())
        .and_then(|len| len.parse::<usize>().ok())
        .map(|len| len <= MAX_BUFFERED_BODY_BYTES)
        .unwrap_or(false)
}

/// Typed extractor for the verified request context.
///
/// Requires `authorization_gate` on the route; without it the extractor
/// rejects with a 500 rather than pretending the request was verified.
#[derive(Debug, Clone)]
pub struct VerifiedOrg(pub VerifiedContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for VerifiedOrg
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<VerifiedContext>()
            .cloned()
            .map(VerifiedOrg)
            .ok_or_else(|| {
                ApiError::internal_error(
                    "VerifiedContext not found in request extensions. \
                     Ensure authorization_gate is applied to this route.",
                )
            })
    }
}

impl std::ops::Deref for VerifiedOrg {
    type Target = VerifiedContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;

    fn test_state() -> GateState {
        use crate::audit::TracingAuditLogger;
        use crate::identity::UserRecord;
        use crate::token::{FixedClock, JwtSecret};

        struct NoIdentity;
        #[async_trait::async_trait]
        impl IdentityResolver for NoIdentity {
            async fn resolve(&self, _user_id: &str) -> Result<UserRecord, IdentityError> {
                Err(IdentityError::NotFound)
            }
        }

        struct NoMembership;
        #[async_trait::async_trait]
        impl MembershipVerifier for NoMembership {
            async fn verify(
                &self,
                _user_id: &str,
                _org: OrgId,
            ) -> Result<MembershipStatus, MembershipError> {
                Ok(MembershipStatus::NotActive)
            }
        }

        GateState::new(
            TokenVerifier::new(
                JwtSecret::new("gate_unit_test_secret_000000000000".to_string()).unwrap(),
                60,
                Arc::new(FixedClock(1_700_000_000)),
            ),
            Arc::new(NoIdentity),
            Arc::new(NoMembership),
            Arc::new(TracingAuditLogger),
        )
    }

    #[test]
    fn exemption_list_matches_exact_and_prefix() {
        let state = test_state();
        assert!(state.is_exempt("/health"));
        assert!(state.is_exempt("/api/v1/auth/login"));
        assert!(state.is_exempt("/docs"));
        assert!(state.is_exempt("/docs/openapi"));
        assert!(!state.is_exempt("/api/v1/courses"));
        assert!(!state.is_exempt("/healthcheck"));
        assert!(!state.is_exempt("/api/v1/auth/login/extra"));
    }

    #[test]
    fn resource_parts_come_from_the_api_path() {
        assert_eq!(
            resource_parts("/api/v1/sessions/s1"),
            (Some("sessions".to_string()), Some("s1".to_string()))
        );
        assert_eq!(
            resource_parts("/api/v1/cache/stats"),
            (Some("cache".to_string()), Some("stats".to_string()))
        );
        assert_eq!(resource_parts("/api/v1/courses"), (Some("courses".to_string()), None));
    }

    #[test]
    fn body_buffering_is_limited_to_small_json_writes() {
        let cases = [
            ("POST", "application/json", "100", true),
            ("PUT", "application/json; charset=utf-8", "100", true),
            ("PATCH", "application/json", "100", true),
            ("GET", "application/json", "100", false),
            ("DELETE", "application/json", "100", false),
            ("POST", "text/plain", "100", false),
            ("POST", "application/json", &(MAX_BUFFERED_BODY_BYTES + 1).to_string(), false),
        ];

        for (method, content_type, length, expected) in cases {
            let (parts, _) = HttpRequest::builder()
                .method(method)
                .uri("/api/v1/courses")
                .header("content-type", content_type)
                .header("content-length", length)
                .body(Body::empty())
                .unwrap()
                .into_parts();
            assert_eq!(
                should_buffer_body(&parts),
                expected,
                "method={method} content_type={content_type} length={length}"
            );
        }
    }

    #[test]
    fn missing_content_length_disables_buffering() {
        let (parts, _) = HttpRequest::builder()
            .method("POST")
            .uri("/api/v1/courses")
            .header("content-type", "application/json")
            .body(Body::empty())
            .unwrap()
            .into_parts();
        assert!(!should_buffer_body(&parts));
    }

    #[test]
    fn client_ip_prefers_forwarded_for() {
        let (parts, _) = HttpRequest::builder()
            .uri("/")
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .header("x-real-ip", "10.0.0.2")
            .body(Body::empty())
            .unwrap()
            .into_parts();
        assert_eq!(extract_client_ip(&parts).as_deref(), Some("203.0.113.7"));

        let (parts, _) = HttpRequest::builder()
            .uri("/")
            .header("x-real-ip", "10.0.0.2")
            .body(Body::empty())
            .unwrap()
            .into_parts();
        assert_eq!(extract_client_ip(&parts).as_deref(), Some("10.0.0.2"));
    }
}
