//! Key-value backend abstraction.
//!
//! The tenant cache talks to whatever shared store the deployment provides
//! through [`KeyValueStore`]. The in-memory implementation backs tests and
//! single-node development; production wires in a networked store behind
//! the same trait.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

/// Errors surfaced by a backend. The tenant cache absorbs these; callers
/// of the cache never see them.
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("backend protocol error: {0}")]
    Protocol(String),
}

/// Minimal contract the tenant cache needs from a shared store: value
/// reads and writes with expiry, deletion, existence, and prefix/pattern
/// key scans.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value at `key`, if present and unexpired.
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Store `value` at `key` with a time-to-live.
    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), KvError>;

    /// Delete the given keys, returning how many existed.
    async fn del(&self, keys: &[String]) -> Result<u64, KvError>;

    /// Whether `key` currently exists.
    async fn exists(&self, key: &str) -> Result<bool, KvError>;

    /// All keys matching a glob pattern (`*` and `?` wildcards).
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, KvError>;
}

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process [`KeyValueStore`] with lazy expiry.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all live physical keys. Test-support only; the cache
    /// itself never enumerates outside a tenant prefix.
    pub async fn raw_keys(&self) -> Vec<String> {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .iter()
            .filter(|(_, e)| e.expires_at > now)
            .map(|(k, _)| k.clone())
            .collect()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|e| e.expires_at > now)
            .map(|e| e.value.clone()))
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), KvError> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64, KvError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let mut removed = 0;
        for key in keys {
            if let Some(entry) = entries.remove(key) {
                if entry.expires_at > now {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    async fn exists(&self, key: &str) -> Result<bool, KvError> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries.get(key).is_some_and(|e| e.expires_at > now))
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, KvError> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|(k, e)| e.expires_at > now && glob_match(pattern, k))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

/// Glob matcher for the `*`/`?` subset backends support for key scans.
pub(crate) fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();

    // Iterative matcher with single-star backtracking.
    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;
    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_basics() {
        assert!(glob_match("org:a:*", "org:a:course:x"));
        assert!(!glob_match("org:a:*", "org:b:course:x"));
        assert!(glob_match("org:a:course:?", "org:a:course:x"));
        assert!(!glob_match("org:a:course:?", "org:a:course:xy"));
        assert!(glob_match("*", "anything"));
        assert!(glob_match("exact", "exact"));
        assert!(!glob_match("exact", "exact-no"));
    }

    #[tokio::test]
    async fn set_get_del_exists() {
        let store = MemoryKvStore::new();
        store
            .set_ex("k1", "v1".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(store.get("k1").await.unwrap().as_deref(), Some("v1"));
        assert!(store.exists("k1").await.unwrap());
        assert!(!store.exists("k2").await.unwrap());

        let removed = store
            .del(&["k1".to_string(), "k2".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.get("k1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entries_are_invisible() {
        let store = MemoryKvStore::new();
        store
            .set_ex("short", "v".to_string(), Duration::from_millis(0))
            .await
            .unwrap();

        assert_eq!(store.get("short").await.unwrap(), None);
        assert!(!store.exists("short").await.unwrap());
        assert!(store.keys("*").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn keys_respects_pattern() {
        let store = MemoryKvStore::new();
        for k in ["org:a:course:1", "org:a:user:2", "org:b:course:3"] {
            store
                .set_ex(k, "v".to_string(), Duration::from_secs(60))
                .await
                .unwrap();
        }
        let mut keys = store.keys("org:a:*").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["org:a:course:1", "org:a:user:2"]);
    }
}
