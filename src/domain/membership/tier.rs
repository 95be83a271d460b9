//! Membership tier definitions.
//!
//! Content is gated on exactly two tiers: everybody starts on `Free`, and a
//! successful purchase moves a profile to `Premium` until its expiry.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Membership tier stored on a profile and purchased by a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipType {
    /// Default tier - public lessons only.
    #[default]
    Free,

    /// Paid tier - premium lessons and videos until expiry.
    Premium,
}

impl MembershipType {
    /// Returns true if this tier is sold through a transaction.
    pub fn is_paid(&self) -> bool {
        matches!(self, MembershipType::Premium)
    }

    /// Lowercase wire/database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipType::Free => "free",
            MembershipType::Premium => "premium",
        }
    }
}

impl std::fmt::Display for MembershipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MembershipType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "free" => Ok(MembershipType::Free),
            "premium" => Ok(MembershipType::Premium),
            "" => Err(ValidationError::empty_field("membership_type")),
            other => Err(ValidationError::invalid_format(
                "membership_type",
                format!("unknown membership type '{}'", other),
            )),
        }
    }
}
