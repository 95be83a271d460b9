//! Role-based authorization predicate.
//!
//! Content-editing endpoints all ask the same question ("is this caller an
//! admin?"). The answer lives here once instead of being re-derived per
//! handler.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// Role attached to a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    /// Database/wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(ValidationError::invalid_format(
                "role",
                format!("unknown role '{}'", other),
            )),
        }
    }
}

/// Anything that carries a role.
pub trait HasRole {
    fn role(&self) -> Role;
}

/// The single admin predicate used by every admin-only operation.
pub fn is_admin(subject: &impl HasRole) -> bool {
    subject.role() == Role::Admin
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Subject(Role);

    impl HasRole for Subject {
        fn role(&self) -> Role {
            self.0
        }
    }

    #[test]
    fn default_role_is_user() {
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn only_admin_passes() {
        assert!(is_admin(&Subject(Role::Admin)));
        assert!(!is_admin(&Subject(Role::User)));
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert!("owner".parse::<Role>().is_err());
    }
}
