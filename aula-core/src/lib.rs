//! AULA Core: shared vocabulary types.
//!
//! This crate holds the types every other AULA crate agrees on:
//! - [`OrgId`]: the organization (tenant) identifier
//! - [`Role`] and [`Action`]: the closed role enum and its permission table
//! - [`CacheKeyType`]: the registry of cacheable entity kinds
//!
//! Nothing here performs I/O; these are the invariant-bearing types that
//! the authorization gate and the tenant cache build on.

pub mod kind;
pub mod org;
pub mod role;

pub use kind::CacheKeyType;
pub use org::OrgId;
pub use role::{Action, Role};

/// Errors produced by core type parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// The value is not a syntactically valid organization id.
    #[error("invalid organization id: {value:?}")]
    InvalidOrgId { value: String },

    /// The value does not name a known role.
    #[error("unknown role: {value:?}")]
    InvalidRole { value: String },
}
