//! Shared fixtures for gate integration tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;

use aula_api::audit::RecordingAuditLogger;
use aula_api::identity::{IdentityError, IdentityResolver, UserRecord};
use aula_api::membership::{MembershipError, MembershipStatus, MembershipVerifier};
use aula_api::routes::create_router;
use aula_api::token::{FixedClock, JwtSecret, TokenVerifier};
use aula_api::{AppState, GateState};
use aula_cache::{MemoryKvStore, TenantCache};
use aula_core::{OrgId, Role};

pub const ORG_A: &str = "11111111-1111-1111-1111-111111111111";
pub const ORG_B: &str = "22222222-2222-2222-2222-222222222222";
pub const NOW: i64 = 1_700_000_000;
pub const TEST_SECRET: &str = "integration_test_secret_0123456789ab";

/// Identity service fixture backed by a map.
#[derive(Default)]
pub struct StaticIdentityResolver {
    users: HashMap<String, UserRecord>,
}

impl StaticIdentityResolver {
    pub fn with_user(mut self, id: &str, role: Role) -> Self {
        self.users.insert(
            id.to_string(),
            UserRecord {
                id: id.to_string(),
                email: Some(format!("{id}@example.edu")),
                role,
                organization_id: None,
            },
        );
        self
    }
}

#[async_trait]
impl IdentityResolver for StaticIdentityResolver {
    async fn resolve(&self, user_id: &str) -> Result<UserRecord, IdentityError> {
        self.users
            .get(user_id)
            .cloned()
            .ok_or(IdentityError::NotFound)
    }
}

/// Membership service fixture: a set of (user, org) pairs, or a
/// simulated outage.
#[derive(Default)]
pub struct StaticMembershipVerifier {
    members: HashSet<(String, String)>,
    outage: bool,
}

impl StaticMembershipVerifier {
    pub fn with_member(mut self, user_id: &str, org: &str) -> Self {
        self.members.insert((user_id.to_string(), org.to_string()));
        self
    }

    pub fn unreachable() -> Self {
        Self {
            members: HashSet::new(),
            outage: true,
        }
    }
}

#[async_trait]
impl MembershipVerifier for StaticMembershipVerifier {
    async fn verify(
        &self,
        user_id: &str,
        org: OrgId,
    ) -> Result<MembershipStatus, MembershipError> {
        if self.outage {
            return Err(MembershipError::Unreachable(
                "connection refused".to_string(),
            ));
        }
        if self
            .members
            .contains(&(user_id.to_string(), org.to_string()))
        {
            Ok(MembershipStatus::Active)
        } else {
            Ok(MembershipStatus::NotActive)
        }
    }
}

pub fn test_verifier() -> TokenVerifier {
    TokenVerifier::new(
        JwtSecret::new(TEST_SECRET.to_string()).expect("test secret is valid"),
        60,
        Arc::new(FixedClock(NOW)),
    )
}

/// Sign a token for a user, valid for one hour at the fixed clock.
pub fn token_for(user_id: &str, role: Role) -> String {
    test_verifier()
        .issue(user_id, role, 3600)
        .expect("test token signs")
}

/// Build the full app with injected fixtures. Returns the router and
/// the audit sink for assertions.
pub fn test_app(
    identity: StaticIdentityResolver,
    membership: StaticMembershipVerifier,
) -> (Router, Arc<RecordingAuditLogger>) {
    let audit = Arc::new(RecordingAuditLogger::new());
    let gate = GateState::new(
        test_verifier(),
        Arc::new(identity),
        Arc::new(membership),
        audit.clone(),
    );
    let state = AppState::new(TenantCache::new(Arc::new(MemoryKvStore::new())));
    (create_router(state, gate), audit)
}
