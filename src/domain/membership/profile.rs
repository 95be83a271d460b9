//! Profile aggregate.
//!
//! One profile per user. The profile caches the current entitlement (tier and
//! expiry) so that access checks never replay transaction history.
//!
//! # Invariants
//!
//! - `membership_expires_at` only carries meaning when the tier is premium
//! - a premium profile whose expiry is not in the future is never entitled,
//!   even before the sweeper has downgraded it
//! - `version` increases by one on every persisted change; stores refuse an
//!   update whose expected version does not match

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode, HasRole, Role, Timestamp, UserId};

use super::{AccessDecision, MembershipType};

/// Length of one purchased premium period, in calendar months.
pub const PREMIUM_PERIOD_MONTHS: u32 = 1;

/// User profile carrying the membership tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Owning user (immutable).
    pub user_id: UserId,

    /// Role used by admin-only operations.
    pub role: Role,

    /// Current tier.
    pub membership_type: MembershipType,

    /// End of the premium period, if any.
    pub membership_expires_at: Option<Timestamp>,

    /// Start of the current premium period, if any.
    pub membership_started_at: Option<Timestamp>,

    pub created_at: Timestamp,

    /// Last modification time.
    pub updated_at: Timestamp,

    /// Optimistic-locking version.
    pub version: i64,
}

impl Profile {
    /// Creates the default free profile used on first authentication.
    pub fn new_free(user_id: UserId, now: Timestamp) -> Self {
        Self {
            user_id,
            role: Role::User,
            membership_type: MembershipType::Free,
            membership_expires_at: None,
            membership_started_at: None,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    /// Evaluates the entitlement rule at `now`.
    ///
    /// Premium with no expiry, or with an expiry strictly after `now`, is
    /// granted. An expiry equal to `now` is already expired.
    pub fn access_at(&self, now: &Timestamp) -> AccessDecision {
        match self.membership_type {
            MembershipType::Free => AccessDecision::FreeTier,
            MembershipType::Premium => match &self.membership_expires_at {
                Some(expires_at) if !expires_at.is_after(now) => AccessDecision::Expired,
                _ => AccessDecision::Granted,
            },
        }
    }

    /// Shorthand for `access_at(now).is_granted()`.
    pub fn has_premium_access(&self, now: &Timestamp) -> bool {
        self.access_at(now).is_granted()
    }

    /// True when the sweeper must downgrade this profile: premium with an
    /// expiry strictly before `now`.
    pub fn is_sweepable(&self, now: &Timestamp) -> bool {
        self.membership_type == MembershipType::Premium
            && self
                .membership_expires_at
                .is_some_and(|expires_at| expires_at.is_before(now))
    }

    /// Builds the update that grants one premium period confirmed at
    /// `confirmed_at`.
    ///
    /// The new expiry is `confirmed_at + 1 calendar month` (clamped to the
    /// last day of the target month). A grant never shortens access: if the
    /// profile already holds premium until a later instant, or premium with
    /// no expiry, that is kept.
    pub fn premium_grant(&self, confirmed_at: Timestamp) -> Result<ProfileUpdate, DomainError> {
        let period_end = confirmed_at
            .add_calendar_months(PREMIUM_PERIOD_MONTHS)
            .ok_or_else(|| {
                DomainError::new(ErrorCode::InternalError, "Membership expiry out of range")
                    .with_detail("confirmed_at", confirmed_at.to_string())
            })?;

        let currently_entitled = self.has_premium_access(&confirmed_at);
        let expires_at = match (currently_entitled, self.membership_expires_at) {
            (true, None) => None,
            (true, Some(existing)) if existing.is_after(&period_end) => Some(existing),
            _ => Some(period_end),
        };
        let started_at = match (currently_entitled, self.membership_started_at) {
            (true, Some(existing)) => existing,
            _ => confirmed_at,
        };

        Ok(ProfileUpdate::new()
            .membership_type(MembershipType::Premium)
            .membership_expires_at(expires_at)
            .membership_started_at(Some(started_at)))
    }

    /// Builds the update that returns a stale profile to the free tier.
    pub fn downgrade() -> ProfileUpdate {
        ProfileUpdate::new()
            .membership_type(MembershipType::Free)
            .membership_expires_at(None)
            .membership_started_at(None)
    }

    /// Applies a partial update in place, bumping version and `updated_at`.
    ///
    /// Used by stores that keep aggregates in memory; SQL stores express the
    /// same thing with `COALESCE` and `version = version + 1`.
    pub fn apply(&mut self, update: &ProfileUpdate, now: Timestamp) {
        if let Some(tier) = update.membership_type {
            self.membership_type = tier;
        }
        if let Some(expires_at) = update.membership_expires_at {
            self.membership_expires_at = expires_at;
        }
        if let Some(started_at) = update.membership_started_at {
            self.membership_started_at = started_at;
        }
        self.updated_at = now;
        self.version += 1;
    }
}

impl HasRole for Profile {
    fn role(&self) -> Role {
        self.role
    }
}

/// Partial profile update.
///
/// `None` leaves a field untouched; `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub membership_type: Option<MembershipType>,
    pub membership_expires_at: Option<Option<Timestamp>>,
    pub membership_started_at: Option<Option<Timestamp>>,
}

impl ProfileUpdate {
    /// Creates an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn membership_type(mut self, tier: MembershipType) -> Self {
        self.membership_type = Some(tier);
        self
    }

    pub fn membership_expires_at(mut self, expires_at: Option<Timestamp>) -> Self {
        self.membership_expires_at = Some(expires_at);
        self
    }

    pub fn membership_started_at(mut self, started_at: Option<Timestamp>) -> Self {
        self.membership_started_at = Some(started_at);
        self
    }

    /// Returns true if no field would change.
    pub fn is_empty(&self) -> bool {
        self.membership_type.is_none()
            && self.membership_expires_at.is_none()
            && self.membership_started_at.is_none()
    }

    /// Returns true if applying this update would alter a membership field of
    /// `profile`.
    pub fn changes(&self, profile: &Profile) -> bool {
        self.membership_type
            .is_some_and(|tier| tier != profile.membership_type)
            || self
                .membership_expires_at
                .is_some_and(|expires_at| expires_at != profile.membership_expires_at)
            || self
                .membership_started_at
                .is_some_and(|started_at| started_at != profile.membership_started_at)
    }

    /// Expiry this update writes, if it writes one.
    pub fn expires_at(&self) -> Option<Timestamp> {
        self.membership_expires_at.flatten()
    }
}
