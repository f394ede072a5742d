//! Organization (tenant) identifier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreError;

/// Identifier of an organization, the unit of tenant isolation.
///
/// Every cache key and every authorization decision is scoped by one of
/// these. The newtype exists so an organization id can never be confused
/// with any other UUID in a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrgId(Uuid);

impl OrgId {
    /// Wrap an existing UUID.
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generate a fresh, timestamp-sortable id.
    pub fn now_v7() -> Self {
        Self(Uuid::now_v7())
    }

    /// The nil id, used only as an explicit "no organization" marker.
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Parse from a string, rejecting anything that is not a well-formed
    /// UUID. Empty and whitespace-only input is rejected outright.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidOrgId {
                value: value.to_string(),
            });
        }
        Uuid::parse_str(trimmed)
            .map(Self)
            .map_err(|_| CoreError::InvalidOrgId {
                value: value.to_string(),
            })
    }
}

impl fmt::Display for OrgId {
    // Hyphenated lowercase, matching the canonical cache key form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for OrgId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_canonical_uuid() {
        let id = OrgId::parse("11111111-1111-1111-1111-111111111111")
            .expect("canonical uuid should parse");
        assert_eq!(id.to_string(), "11111111-1111-1111-1111-111111111111");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(OrgId::parse("not-a-uuid").is_err());
        assert!(OrgId::parse("").is_err());
        assert!(OrgId::parse("   ").is_err());
    }

    #[test]
    fn parse_trims_whitespace() {
        let id = OrgId::parse(" 22222222-2222-2222-2222-222222222222 ")
            .expect("padded uuid should parse");
        assert_eq!(id.to_string(), "22222222-2222-2222-2222-222222222222");
    }

    #[test]
    fn serde_is_transparent() {
        let id = OrgId::now_v7();
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, format!("\"{}\"", id));
        let back: OrgId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }
}
