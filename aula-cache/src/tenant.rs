//! Tenant-isolated cache operations.
//!
//! [`TenantCache`] is the only way application code reaches the shared
//! backend. Every operation takes the caller's organization id, validates
//! it, and derives the physical key itself; no caller-supplied string is
//! ever used as a raw backend key. Backend failures degrade to cache
//! misses so an outage slows the platform down instead of taking it down.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use aula_core::{CacheKeyType, OrgId};

use crate::backend::{KeyValueStore, KvError};
use crate::key::CacheKey;
use crate::metrics;

/// Default entry lifetime when a caller does not pick one.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// How a cache operation failed, for logging and metrics. Never crosses
/// the public API: callers see `None`, `false`, or an empty list.
#[derive(Debug)]
enum CacheFailure {
    /// The organization id did not parse; the operation never reached
    /// the backend.
    InvalidOrg,
    /// The key was absent or expired.
    Miss,
    /// The backend returned an error or was unreachable.
    Backend(KvError),
    /// A stored value failed to serialize or deserialize.
    Serde(serde_json::Error),
}

impl CacheFailure {
    fn outcome(&self) -> &'static str {
        match self {
            CacheFailure::InvalidOrg => "invalid_org",
            CacheFailure::Miss => "miss",
            CacheFailure::Backend(_) => "backend_error",
            CacheFailure::Serde(_) => "serde_error",
        }
    }
}

/// Cache statistics for one organization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct OrgCacheStats {
    /// Live entries under the organization's prefix right now.
    pub entries: u64,
    pub hits: u64,
    pub misses: u64,
}

impl OrgCacheStats {
    /// Fraction of reads served from cache, 0.0 when no reads happened.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Cache handle shared across the service. Cloning is cheap.
#[derive(Clone)]
pub struct TenantCache {
    store: Arc<dyn KeyValueStore>,
    default_ttl: Duration,
    stats: Arc<DashMap<OrgId, OrgCacheStats>>,
}

impl TenantCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_default_ttl(store, DEFAULT_TTL)
    }

    pub fn with_default_ttl(store: Arc<dyn KeyValueStore>, default_ttl: Duration) -> Self {
        Self {
            store,
            default_ttl,
            stats: Arc::new(DashMap::new()),
        }
    }

    /// Fetch a value. Returns `None` on a miss, an invalid organization
    /// id, a backend failure, or a corrupt stored value.
    pub async fn get(&self, org: &str, kind: CacheKeyType, id: &str) -> Option<Value> {
        match self.try_get(org, kind, id).await {
            Ok((org, value)) => {
                self.bump(org, true);
                metrics::record("get", "hit");
                Some(value)
            }
            Err(failure) => {
                // Only genuine misses (not rejected ids or backend errors)
                // count toward the tenant's hit rate.
                if matches!(failure, CacheFailure::Miss) {
                    if let Ok(org) = OrgId::parse(org) {
                        self.bump(org, false);
                    }
                }
                self.note_read_failure("get", &failure);
                None
            }
        }
    }

    async fn try_get(
        &self,
        org: &str,
        kind: CacheKeyType,
        id: &str,
    ) -> Result<(OrgId, Value), CacheFailure> {
        let org = OrgId::parse(org).map_err(|_| CacheFailure::InvalidOrg)?;
        let key = CacheKey::new(org, kind, id);
        let raw = self
            .store
            .get(&key.qualified())
            .await
            .map_err(CacheFailure::Backend)?
            .ok_or(CacheFailure::Miss)?;
        let value = serde_json::from_str(&raw).map_err(CacheFailure::Serde)?;
        Ok((org, value))
    }

    /// Store a value with the default lifetime. Returns whether the write
    /// reached the backend.
    pub async fn set<T: Serialize>(&self, org: &str, kind: CacheKeyType, id: &str, value: &T) -> bool {
        self.set_with_ttl(org, kind, id, value, self.default_ttl)
            .await
    }

    /// Store a value with an explicit lifetime.
    pub async fn set_with_ttl<T: Serialize>(
        &self,
        org: &str,
        kind: CacheKeyType,
        id: &str,
        value: &T,
        ttl: Duration,
    ) -> bool {
        let result: Result<(), CacheFailure> = async {
            let org = OrgId::parse(org).map_err(|_| CacheFailure::InvalidOrg)?;
            let key = CacheKey::new(org, kind, id);
            let raw = serde_json::to_string(value).map_err(CacheFailure::Serde)?;
            self.store
                .set_ex(&key.qualified(), raw, ttl)
                .await
                .map_err(CacheFailure::Backend)
        }
        .await;

        match result {
            Ok(()) => {
                metrics::record("set", "ok");
                true
            }
            Err(failure) => {
                self.note_write_failure("set", &failure);
                false
            }
        }
    }

    /// Remove one entry. Returns whether it existed.
    pub async fn delete(&self, org: &str, kind: CacheKeyType, id: &str) -> bool {
        let result: Result<u64, CacheFailure> = async {
            let org = OrgId::parse(org).map_err(|_| CacheFailure::InvalidOrg)?;
            let key = CacheKey::new(org, kind, id);
            self.store
                .del(&[key.qualified()])
                .await
                .map_err(CacheFailure::Backend)
        }
        .await;

        match result {
            Ok(removed) => {
                metrics::record("delete", "ok");
                removed > 0
            }
            Err(failure) => {
                self.note_write_failure("delete", &failure);
                false
            }
        }
    }

    /// Whether an entry exists. Failures read as absence.
    pub async fn exists(&self, org: &str, kind: CacheKeyType, id: &str) -> bool {
        let result: Result<bool, CacheFailure> = async {
            let org = OrgId::parse(org).map_err(|_| CacheFailure::InvalidOrg)?;
            let key = CacheKey::new(org, kind, id);
            self.store
                .exists(&key.qualified())
                .await
                .map_err(CacheFailure::Backend)
        }
        .await;

        match result {
            Ok(found) => {
                metrics::record("exists", "ok");
                found
            }
            Err(failure) => {
                self.note_read_failure("exists", &failure);
                false
            }
        }
    }

    /// Logical ids of this organization's entries of one kind whose id
    /// matches `pattern` (glob `*`/`?`). The scan runs inside the tenant
    /// prefix, so the result can never contain another tenant's keys, and
    /// the prefix is stripped before ids are returned.
    pub async fn keys_by_pattern(
        &self,
        org: &str,
        kind: CacheKeyType,
        pattern: &str,
    ) -> Vec<String> {
        let result: Result<Vec<String>, CacheFailure> = async {
            let org = OrgId::parse(org).map_err(|_| CacheFailure::InvalidOrg)?;
            let prefix = CacheKey::kind_prefix(org, &kind);
            let scan = format!("{prefix}{pattern}");
            let raw = self
                .store
                .keys(&scan)
                .await
                .map_err(CacheFailure::Backend)?;
            Ok(raw
                .iter()
                .filter_map(|k| k.strip_prefix(&prefix))
                .map(str::to_string)
                .collect())
        }
        .await;

        match result {
            Ok(ids) => {
                metrics::record("keys", "ok");
                ids
            }
            Err(failure) => {
                self.note_read_failure("keys", &failure);
                Vec::new()
            }
        }
    }

    /// Drop every entry belonging to one organization. Returns how many
    /// entries were removed; 0 on failure.
    pub async fn flush_organization(&self, org: &str) -> u64 {
        let result: Result<u64, CacheFailure> = async {
            let org = OrgId::parse(org).map_err(|_| CacheFailure::InvalidOrg)?;
            let pattern = format!("{}*", CacheKey::org_prefix(org));
            let keys = self
                .store
                .keys(&pattern)
                .await
                .map_err(CacheFailure::Backend)?;
            if keys.is_empty() {
                return Ok(0);
            }
            self.store.del(&keys).await.map_err(CacheFailure::Backend)
        }
        .await;

        match result {
            Ok(removed) => {
                metrics::record("flush", "ok");
                debug!(removed, "flushed organization cache");
                removed
            }
            Err(failure) => {
                self.note_write_failure("flush", &failure);
                0
            }
        }
    }

    /// Statistics for one organization: the current entry count (a scan
    /// of the org's own prefix) plus hit/miss counters accumulated since
    /// startup. A backend failure leaves the entry count at zero.
    pub async fn stats_for(&self, org: OrgId) -> OrgCacheStats {
        let mut stats = self.stats.get(&org).map(|s| *s).unwrap_or_default();
        let pattern = format!("{}*", CacheKey::org_prefix(org));
        match self.store.keys(&pattern).await {
            Ok(keys) => stats.entries = keys.len() as u64,
            Err(err) => {
                warn!(error = %err, "cache backend failure while counting entries");
            }
        }
        stats
    }

    fn bump(&self, org: OrgId, hit: bool) {
        let mut entry = self.stats.entry(org).or_default();
        if hit {
            entry.hits += 1;
        } else {
            entry.misses += 1;
        }
    }

    fn note_read_failure(&self, operation: &str, failure: &CacheFailure) {
        metrics::record(operation, failure.outcome());
        match failure {
            CacheFailure::Miss => {
                // Routine. Misses are accounted in the tenant stats, not logged.
            }
            CacheFailure::InvalidOrg => {
                warn!(operation, "cache operation rejected: invalid organization id");
            }
            CacheFailure::Backend(err) => {
                warn!(operation, error = %err, "cache backend failure, treating as miss");
            }
            CacheFailure::Serde(err) => {
                warn!(operation, error = %err, "corrupt cache entry, treating as miss");
            }
        }
    }

    fn note_write_failure(&self, operation: &str, failure: &CacheFailure) {
        metrics::record(operation, failure.outcome());
        match failure {
            CacheFailure::InvalidOrg => {
                warn!(operation, "cache operation rejected: invalid organization id");
            }
            CacheFailure::Backend(err) => {
                warn!(operation, error = %err, "cache backend failure, write dropped");
            }
            CacheFailure::Serde(err) => {
                warn!(operation, error = %err, "value not serializable, write dropped");
            }
            CacheFailure::Miss => {}
        }
    }
}
