//! Typed convenience layer over [`TenantCache`].
//!
//! Route handlers work with domain structs, not JSON values and kind
//! strings. Each entity kind gets its own lifetime here so TTL policy
//! lives in one place.

use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};

use aula_core::CacheKeyType;

use crate::tenant::TenantCache;

const COURSE_TTL: Duration = Duration::from_secs(3600);
const SESSION_TTL: Duration = Duration::from_secs(1800);
const USER_TTL: Duration = Duration::from_secs(900);
const QUIZ_TTL: Duration = Duration::from_secs(3600);

/// Entity-aware cache facade. Cloning is cheap.
#[derive(Clone)]
pub struct EntityCache {
    inner: TenantCache,
}

impl EntityCache {
    pub fn new(inner: TenantCache) -> Self {
        Self { inner }
    }

    /// The underlying tenant cache, for operations the facade does not
    /// wrap (flushes, stats).
    pub fn tenant(&self) -> &TenantCache {
        &self.inner
    }

    pub async fn cache_course<T: Serialize>(&self, org: &str, course_id: &str, course: &T) -> bool {
        self.inner
            .set_with_ttl(org, CacheKeyType::Course, course_id, course, COURSE_TTL)
            .await
    }

    pub async fn get_course<T: DeserializeOwned>(&self, org: &str, course_id: &str) -> Option<T> {
        self.get_typed(org, CacheKeyType::Course, course_id).await
    }

    pub async fn evict_course(&self, org: &str, course_id: &str) -> bool {
        self.inner.delete(org, CacheKeyType::Course, course_id).await
    }

    pub async fn cache_session<T: Serialize>(
        &self,
        org: &str,
        session_id: &str,
        session: &T,
    ) -> bool {
        self.inner
            .set_with_ttl(org, CacheKeyType::Session, session_id, session, SESSION_TTL)
            .await
    }

    pub async fn get_session<T: DeserializeOwned>(&self, org: &str, session_id: &str) -> Option<T> {
        self.get_typed(org, CacheKeyType::Session, session_id).await
    }

    pub async fn evict_session(&self, org: &str, session_id: &str) -> bool {
        self.inner
            .delete(org, CacheKeyType::Session, session_id)
            .await
    }

    pub async fn cache_user<T: Serialize>(&self, org: &str, user_id: &str, user: &T) -> bool {
        self.inner
            .set_with_ttl(org, CacheKeyType::User, user_id, user, USER_TTL)
            .await
    }

    pub async fn get_user<T: DeserializeOwned>(&self, org: &str, user_id: &str) -> Option<T> {
        self.get_typed(org, CacheKeyType::User, user_id).await
    }

    pub async fn evict_user(&self, org: &str, user_id: &str) -> bool {
        self.inner.delete(org, CacheKeyType::User, user_id).await
    }

    pub async fn cache_quiz<T: Serialize>(&self, org: &str, quiz_id: &str, quiz: &T) -> bool {
        self.inner
            .set_with_ttl(org, CacheKeyType::Quiz, quiz_id, quiz, QUIZ_TTL)
            .await
    }

    pub async fn get_quiz<T: DeserializeOwned>(&self, org: &str, quiz_id: &str) -> Option<T> {
        self.get_typed(org, CacheKeyType::Quiz, quiz_id).await
    }

    pub async fn evict_quiz(&self, org: &str, quiz_id: &str) -> bool {
        self.inner.delete(org, CacheKeyType::Quiz, quiz_id).await
    }

    async fn get_typed<T: DeserializeOwned>(
        &self,
        org: &str,
        kind: CacheKeyType,
        id: &str,
    ) -> Option<T> {
        let value = self.inner.get(org, kind, id).await?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(err) => {
                tracing::warn!(error = %err, "cached value does not match requested type");
                None
            }
        }
    }
}
