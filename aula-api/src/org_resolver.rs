//! Organization context resolution.
//!
//! The gate determines which organization a request targets by trying a
//! fixed list of extractors in order: header, then path, then query
//! string, then (for writes) the request body. The first extractor that
//! yields a well-formed id wins; a malformed candidate falls through to
//! the next source instead of aborting resolution.

use axum::http::request::Parts;
use serde_json::Value;

use aula_core::OrgId;

/// Header carrying the organization id.
pub const ORG_HEADER: &str = "x-organization-id";

/// Where the organization id was found, recorded for audit events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrgIdSource {
    Header,
    Path,
    Query,
    Body,
}

impl OrgIdSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgIdSource::Header => "header",
            OrgIdSource::Path => "path",
            OrgIdSource::Query => "query",
            OrgIdSource::Body => "body",
        }
    }
}

/// A resolved organization id and the extractor that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedOrg {
    pub org: OrgId,
    pub source: OrgIdSource,
}

/// Run the extractor chain. `body` is only provided for write requests
/// whose JSON body the gate chose to buffer.
pub fn resolve(parts: &Parts, body: Option<&Value>) -> Option<ResolvedOrg> {
    if let Some(org) = from_header(parts) {
        return Some(ResolvedOrg {
            org,
            source: OrgIdSource::Header,
        });
    }
    if let Some(org) = from_path(parts.uri.path()) {
        return Some(ResolvedOrg {
            org,
            source: OrgIdSource::Path,
        });
    }
    if let Some(org) = from_query(parts.uri.query()) {
        return Some(ResolvedOrg {
            org,
            source: OrgIdSource::Query,
        });
    }
    if let Some(org) = body.and_then(from_body) {
        return Some(ResolvedOrg {
            org,
            source: OrgIdSource::Body,
        });
    }
    None
}

fn from_header(parts: &Parts) -> Option<OrgId> {
    parts
        .headers
        .get(ORG_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|raw| OrgId::parse(raw).ok())
}

/// Match `/organizations/{id}` anywhere in the path.
fn from_path(path: &str) -> Option<OrgId> {
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    while let Some(segment) = segments.next() {
        if segment == "organizations" {
            if let Some(candidate) = segments.next() {
                if let Ok(org) = OrgId::parse(candidate) {
                    return Some(org);
                }
            }
        }
    }
    None
}

fn from_query(query: Option<&str>) -> Option<OrgId> {
    let query = query?;
    for pair in query.split('&') {
        let Some((name, value)) = pair.split_once('=') else {
            continue;
        };
        if name == "organization_id" || name == "org_id" {
            if let Ok(org) = OrgId::parse(value) {
                return Some(org);
            }
        }
    }
    None
}

fn from_body(body: &Value) -> Option<OrgId> {
    body.get("organization_id")
        .and_then(Value::as_str)
        .and_then(|raw| OrgId::parse(raw).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;

    const ORG_A: &str = "11111111-1111-1111-1111-111111111111";
    const ORG_B: &str = "22222222-2222-2222-2222-222222222222";

    fn parts_for(uri: &str, header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri(uri);
        if let Some(value) = header {
            builder = builder.header(ORG_HEADER, value);
        }
        let (parts, _) = builder.body(Body::empty()).unwrap().into_parts();
        parts
    }

    #[test]
    fn header_wins_over_every_other_source() {
        let parts = parts_for(
            &format!("/api/v1/organizations/{ORG_B}/courses?organization_id={ORG_B}"),
            Some(ORG_A),
        );
        let resolved = resolve(&parts, Some(&json!({"organization_id": ORG_B}))).unwrap();
        assert_eq!(resolved.org.to_string(), ORG_A);
        assert_eq!(resolved.source, OrgIdSource::Header);
    }

    #[test]
    fn invalid_header_falls_through_to_path() {
        let parts = parts_for(
            &format!("/api/v1/organizations/{ORG_B}/courses"),
            Some("not-a-uuid"),
        );
        let resolved = resolve(&parts, None).unwrap();
        assert_eq!(resolved.org.to_string(), ORG_B);
        assert_eq!(resolved.source, OrgIdSource::Path);
    }

    #[test]
    fn query_is_consulted_after_path() {
        let parts = parts_for(&format!("/api/v1/courses?organization_id={ORG_A}"), None);
        let resolved = resolve(&parts, None).unwrap();
        assert_eq!(resolved.org.to_string(), ORG_A);
        assert_eq!(resolved.source, OrgIdSource::Query);
    }

    #[test]
    fn org_id_query_alias_is_accepted() {
        let parts = parts_for(&format!("/api/v1/courses?org_id={ORG_A}"), None);
        assert!(resolve(&parts, None).is_some());
    }

    #[test]
    fn body_is_the_last_resort() {
        let parts = parts_for("/api/v1/courses", None);
        let body = json!({"organization_id": ORG_A, "title": "Rust"});
        let resolved = resolve(&parts, Some(&body)).unwrap();
        assert_eq!(resolved.org.to_string(), ORG_A);
        assert_eq!(resolved.source, OrgIdSource::Body);
    }

    #[test]
    fn nothing_resolves_to_none() {
        let parts = parts_for("/api/v1/courses", None);
        assert!(resolve(&parts, None).is_none());
        assert!(resolve(&parts, Some(&json!({"title": "Rust"}))).is_none());
    }

    #[test]
    fn non_string_body_org_is_ignored() {
        let parts = parts_for("/api/v1/courses", None);
        assert!(resolve(&parts, Some(&json!({"organization_id": 42}))).is_none());
    }
}
