//! Access decision for premium-gated content.

use serde::{Deserialize, Serialize};

/// Outcome of an entitlement check, with the reason behind a denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessDecision {
    /// Premium tier with no expiry or an expiry in the future.
    Granted,

    /// No authenticated identity was supplied.
    Unauthenticated,

    /// The user has no profile yet.
    NoProfile,

    /// The profile is on the free tier.
    FreeTier,

    /// Premium tier whose expiry is not in the future (stale profile).
    Expired,

    /// The store could not be read; access fails closed.
    Unavailable,
}

impl AccessDecision {
    /// Only `Granted` lets content through.
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessDecision::Granted)
    }
}
