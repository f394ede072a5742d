//! Registry of cacheable entity kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind segment of a cache key.
///
/// Known kinds come from a fixed registry. Unknown kinds are carried
/// through as [`CacheKeyType::Other`] so the cache stays forward-compatible
/// with entity types added by newer services; callers log them but never
/// reject them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheKeyType {
    Course,
    User,
    Quiz,
    Lab,
    Analytics,
    Session,
    Content,
    /// A kind outside the registry. The inner string is sanitized to the
    /// characters legal in a key segment.
    #[serde(untagged)]
    Other(String),
}

impl CacheKeyType {
    /// Canonical lowercase segment used in physical cache keys.
    pub fn as_str(&self) -> &str {
        match self {
            CacheKeyType::Course => "course",
            CacheKeyType::User => "user",
            CacheKeyType::Quiz => "quiz",
            CacheKeyType::Lab => "lab",
            CacheKeyType::Analytics => "analytics",
            CacheKeyType::Session => "session",
            CacheKeyType::Content => "content",
            CacheKeyType::Other(s) => s.as_str(),
        }
    }

    /// Parse a kind name. Registry names map to their variant; anything
    /// else becomes [`CacheKeyType::Other`], lowercased and stripped of
    /// characters that would corrupt the key layout (the `:` separator in
    /// particular).
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "course" => CacheKeyType::Course,
            "user" => CacheKeyType::User,
            "quiz" => CacheKeyType::Quiz,
            "lab" => CacheKeyType::Lab,
            "analytics" => CacheKeyType::Analytics,
            "session" => CacheKeyType::Session,
            "content" => CacheKeyType::Content,
            other => {
                let sanitized: String = other
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
                    .collect();
                CacheKeyType::Other(sanitized)
            }
        }
    }

    /// Whether this kind is part of the fixed registry.
    pub fn is_registered(&self) -> bool {
        !matches!(self, CacheKeyType::Other(_))
    }
}

impl fmt::Display for CacheKeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
