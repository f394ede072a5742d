//! Security audit trail.
//!
//! Every request that passes through the authorization gate produces
//! exactly one audit event, on every terminal branch. Events go to the
//! structured log under the `security_audit` target so they can be
//! routed to long-term storage independently of application logs.
//!
//! Recording is best-effort: a sink failure must never abort the
//! request that triggered it, but is itself logged at error level.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

/// The two kinds of authorization decision the gate records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityAction {
    /// An organization-scoped access decision (granted, or denied
    /// before membership was evaluated).
    OrganizationAccess,
    /// An authenticated user targeted an organization they do not
    /// belong to.
    UnauthorizedAccessAttempt,
}

impl SecurityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityAction::OrganizationAccess => "ORGANIZATION_ACCESS",
            SecurityAction::UnauthorizedAccessAttempt => "UNAUTHORIZED_ACCESS_ATTEMPT",
        }
    }
}

/// One immutable audit record of one authorization decision.
///
/// `user_id` is `"anonymous"` when the gate rejected the request before
/// an identity was established. `organization_id` is the user's home
/// organization when the identity service tracks one;
/// `attempted_organization_id` is the organization the request targeted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityEvent {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    pub action: SecurityAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempted_organization_id: Option<String>,
    pub success: bool,
    /// Endpoint, method, and the denial reason when there is one.
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Sink for audit events. Infallible by contract; implementations
/// swallow and log their own failures.
#[async_trait]
pub trait SecurityAuditLogger: Send + Sync {
    async fn record(&self, event: SecurityEvent);
}

/// Production sink: structured tracing events under the
/// `security_audit` target. Grants at info, denials at warn, so
/// alerting can filter on severity alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditLogger;

#[async_trait]
impl SecurityAuditLogger for TracingAuditLogger {
    async fn record(&self, event: SecurityEvent) {
        if event.success {
            info!(
                target: "security_audit",
                action = event.action.as_str(),
                user_id = %event.user_id,
                organization_id = event.organization_id.as_deref(),
                attempted_organization_id = event.attempted_organization_id.as_deref(),
                resource_type = event.resource_type.as_deref(),
                resource_id = event.resource_id.as_deref(),
                details = %event.details,
                ip_address = event.ip_address.as_deref(),
                "access granted"
            );
        } else {
            warn!(
                target: "security_audit",
                action = event.action.as_str(),
                user_id = %event.user_id,
                organization_id = event.organization_id.as_deref(),
                attempted_organization_id = event.attempted_organization_id.as_deref(),
                resource_type = event.resource_type.as_deref(),
                resource_id = event.resource_id.as_deref(),
                details = %event.details,
                ip_address = event.ip_address.as_deref(),
                user_agent = event.user_agent.as_deref(),
                "access denied"
            );
        }
    }
}

/// Test sink that stores events for assertions.
#[derive(Debug, Default)]
pub struct RecordingAuditLogger {
    events: Mutex<Vec<SecurityEvent>>,
}

impl RecordingAuditLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SecurityEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SecurityAuditLogger for RecordingAuditLogger {
    async fn record(&self, event: SecurityEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(e) => tracing::error!(error = %e, "audit sink poisoned, event dropped"),
        }
    }
}
