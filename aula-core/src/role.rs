//! Roles and the permission table.
//!
//! Roles form a closed enum checked by exhaustive pattern matching; there
//! is no string-keyed permission lookup anywhere in the codebase.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Coarse-grained actions a role may be allowed to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Read organization-scoped data.
    Read,
    /// Create or modify organization-scoped data.
    Write,
    /// Administrative operations (cache flush, member management).
    Manage,
    /// Inspect telemetry and audit data.
    Audit,
}

/// The closed set of roles recognized by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Organization administrator.
    Admin,
    /// Course instructor.
    Instructor,
    /// Enrolled student. Least-privileged, used as the fallback when the
    /// identity service returns no role.
    #[default]
    Student,
    /// Service-to-service caller.
    Service,
}

impl Role {
    /// Canonical lowercase name, as carried in JWT claims and identity
    /// service responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Instructor => "instructor",
            Role::Student => "student",
            Role::Service => "service",
        }
    }

    /// The permission table. One place, exhaustive match, no strings.
    pub fn allowed_actions(&self) -> &'static [Action] {
        match self {
            Role::Admin => &[Action::Read, Action::Write, Action::Manage, Action::Audit],
            Role::Instructor => &[Action::Read, Action::Write, Action::Audit],
            Role::Student => &[Action::Read],
            Role::Service => &[Action::Read, Action::Write],
        }
    }

    /// Whether this role may perform the given action.
    pub fn allows(&self, action: Action) -> bool {
        self.allowed_actions().contains(&action)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    /// Case-insensitive parse. Unknown names are an error rather than a
    /// silent fallback so callers decide the downgrade policy explicitly.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "instructor" => Ok(Role::Instructor),
            "student" => Ok(Role::Student),
            "service" => Ok(Role::Service),
            _ => Err(CoreError::InvalidRole {
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::Admin, Role::Instructor, Role::Student, Role::Service] {
            let parsed: Role = role.as_str().parse().expect("canonical name parses");
            assert_eq!(parsed, role);
        }
    }

    #[test]
    fn role_parse_is_case_insensitive() {
        assert_eq!("ADMIN".parse::<Role>().expect("parses"), Role::Admin);
        assert_eq!("Instructor".parse::<Role>().expect("parses"), Role::Instructor);
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!("superuser".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn permission_table_shape() {
        assert!(Role::Admin.allows(Action::Manage));
        assert!(Role::Admin.allows(Action::Audit));
        assert!(Role::Instructor.allows(Action::Write));
        assert!(!Role::Instructor.allows(Action::Manage));
        assert!(Role::Student.allows(Action::Read));
        assert!(!Role::Student.allows(Action::Write));
        assert!(Role::Service.allows(Action::Write));
        assert!(!Role::Service.allows(Action::Audit));
    }

    #[test]
    fn default_role_is_least_privileged() {
        assert_eq!(Role::default(), Role::Student);
    }
}
