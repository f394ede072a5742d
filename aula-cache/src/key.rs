//! Canonical cache key layout.
//!
//! Every physical key in the shared backend has the shape
//! `org:{organization_id}:{key_type}:{key_id}`. The organization segment
//! comes first so that all of a tenant's entries share a prefix: pattern
//! scans and whole-tenant flushes operate on that prefix and can never
//! observe another tenant's keys.

use std::fmt;

use aula_core::{CacheKeyType, CoreError, OrgId};

/// A fully-qualified, tenant-scoped cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    org: OrgId,
    kind: CacheKeyType,
    id: String,
}

impl CacheKey {
    /// Build a key from its parts. The id segment is taken as-is except
    /// that `:` is replaced, since a stray separator would let one logical
    /// key masquerade as another.
    pub fn new(org: OrgId, kind: CacheKeyType, id: impl Into<String>) -> Self {
        let id = id.into().replace(':', "_");
        Self { org, kind, id }
    }

    /// The organization this key belongs to.
    pub fn org(&self) -> OrgId {
        self.org
    }

    /// The entity kind segment.
    pub fn kind(&self) -> &CacheKeyType {
        &self.kind
    }

    /// The caller-chosen id segment.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The physical key string sent to the backend.
    pub fn qualified(&self) -> String {
        format!("org:{}:{}:{}", self.org, self.kind, self.id)
    }

    /// Prefix covering every key of this organization, regardless of kind.
    pub fn org_prefix(org: OrgId) -> String {
        format!("org:{}:", org)
    }

    /// Prefix covering every key of one kind within one organization.
    pub fn kind_prefix(org: OrgId, kind: &CacheKeyType) -> String {
        format!("org:{}:{}:", org, kind)
    }

    /// Parse a physical key back into its parts. Used when reflecting
    /// backend scan results to callers, who only ever see logical ids.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let rest = raw.strip_prefix("org:").ok_or(CoreError::InvalidOrgId {
            value: raw.to_string(),
        })?;
        let (org_part, rest) = rest.split_once(':').ok_or(CoreError::InvalidOrgId {
            value: raw.to_string(),
        })?;
        let org = OrgId::parse(org_part)?;
        let (kind_part, id) = rest.split_once(':').ok_or(CoreError::InvalidOrgId {
            value: raw.to_string(),
        })?;
        Ok(Self {
            org,
            kind: CacheKeyType::parse(kind_part),
            id: id.to_string(),
        })
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "org:{}:{}:{}", self.org, self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn org_a() -> OrgId {
        OrgId::parse("11111111-1111-1111-1111-111111111111").unwrap()
    }

    #[test]
    fn qualified_key_has_canonical_shape() {
        let key = CacheKey::new(org_a(), CacheKeyType::Course, "rust-101");
        assert_eq!(
            key.qualified(),
            "org:11111111-1111-1111-1111-111111111111:course:rust-101"
        );
    }

    #[test]
    fn id_separator_is_neutralized() {
        let key = CacheKey::new(org_a(), CacheKeyType::User, "a:b:c");
        assert_eq!(key.id(), "a_b_c");
        let parsed = CacheKey::parse(&key.qualified()).unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn prefixes_nest() {
        let org = org_a();
        let key = CacheKey::new(org, CacheKeyType::Quiz, "q7");
        assert!(key.qualified().starts_with(&CacheKey::org_prefix(org)));
        assert!(key
            .qualified()
            .starts_with(&CacheKey::kind_prefix(org, &CacheKeyType::Quiz)));
    }

    #[test]
    fn parse_rejects_foreign_layouts() {
        assert!(CacheKey::parse("course:rust-101").is_err());
        assert!(CacheKey::parse("org:not-a-uuid:course:x").is_err());
        assert!(CacheKey::parse("org:11111111-1111-1111-1111-111111111111:course").is_err());
    }

    proptest! {
        #[test]
        fn round_trip_preserves_parts(
            org_bytes in any::<u128>(),
            kind in prop::sample::select(vec![
                CacheKeyType::Course,
                CacheKeyType::User,
                CacheKeyType::Session,
                CacheKeyType::Other("enrollment".to_string()),
            ]),
            id in "[a-zA-Z0-9_-]{1,40}",
        ) {
            let org = OrgId::new(Uuid::from_u128(org_bytes));
            let key = CacheKey::new(org, kind, id);
            let parsed = CacheKey::parse(&key.qualified()).unwrap();
            prop_assert_eq!(parsed, key);
        }

        #[test]
        fn distinct_orgs_never_share_prefixes(a in any::<u128>(), b in any::<u128>()) {
            prop_assume!(a != b);
            let pa = CacheKey::org_prefix(OrgId::new(Uuid::from_u128(a)));
            let pb = CacheKey::org_prefix(OrgId::new(Uuid::from_u128(b)));
            prop_assert!(!pa.starts_with(&pb));
            prop_assert!(!pb.starts_with(&pa));
        }
    }
}
