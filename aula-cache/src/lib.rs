//! AULA Cache: tenant-isolated caching over a shared key-value store.
//!
//! Physical keys follow `org:{organization_id}:{key_type}:{key_id}`, so
//! every tenant's entries live under a distinct prefix. [`TenantCache`]
//! derives keys itself from a validated [`aula_core::OrgId`]; there is no
//! API that accepts a raw backend key. Backend failures degrade to cache
//! misses rather than request failures.
//!
//! [`EntityCache`] layers typed accessors and per-entity TTL policy on
//! top for route handlers.

pub mod backend;
pub mod facade;
pub mod key;
pub mod metrics;
pub mod tenant;

pub use backend::{KeyValueStore, KvError, MemoryKvStore};
pub use facade::EntityCache;
pub use key::CacheKey;
pub use tenant::{OrgCacheStats, TenantCache, DEFAULT_TTL};
