//! EntitlementGate - Read-only premium access check.
//!
//! Content-serving code asks the gate before returning a premium lesson or
//! video. The gate never writes: a stale premium profile is denied here and
//! left for the sweeper to correct.

use std::sync::Arc;

use tracing::warn;

use crate::domain::foundation::UserId;
use crate::domain::membership::AccessDecision;
use crate::ports::{Clock, ProfileRepository};

/// In-process entitlement check.
#[derive(Clone)]
pub struct EntitlementGate {
    profiles: Arc<dyn ProfileRepository>,
    clock: Arc<dyn Clock>,
}

impl EntitlementGate {
    pub fn new(profiles: Arc<dyn ProfileRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { profiles, clock }
    }

    /// Returns true only for premium profiles with no expiry or an expiry
    /// strictly in the future. Store errors deny access.
    pub async fn has_premium_access(&self, user_id: Option<&UserId>) -> bool {
        self.check(user_id).await.is_granted()
    }

    /// Same rule as `has_premium_access`, with the reason for a denial.
    pub async fn check(&self, user_id: Option<&UserId>) -> AccessDecision {
        let Some(user_id) = user_id else {
            return AccessDecision::Unauthenticated;
        };

        match self.profiles.find_by_user_id(user_id).await {
            Ok(Some(profile)) => profile.access_at(&self.clock.now()),
            Ok(None) => AccessDecision::NoProfile,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Entitlement lookup failed, denying access");
                AccessDecision::Unavailable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::FixedClock;
    use crate::adapters::memory::InMemoryProfileRepository;
    use crate::domain::foundation::{DomainError, Timestamp};
    use crate::domain::membership::{MembershipType, Profile, ProfileUpdate};
    use async_trait::async_trait;

    struct UnavailableProfiles;

    #[async_trait]
    impl ProfileRepository for UnavailableProfiles {
        async fn find_by_user_id(&self, _user_id: &UserId) -> Result<Option<Profile>, DomainError> {
            Err(DomainError::database("connection refused"))
        }

        async fn create_default(&self, _user_id: &UserId) -> Result<Profile, DomainError> {
            Err(DomainError::database("connection refused"))
        }

        async fn update(
            &self,
            _user_id: &UserId,
            _expected_version: i64,
            _update: ProfileUpdate,
        ) -> Result<Profile, DomainError> {
            Err(DomainError::database("connection refused"))
        }

        async fn find_expired_premium(
            &self,
            _now: &Timestamp,
            _after: Option<&UserId>,
            _limit: u32,
        ) -> Result<Vec<Profile>, DomainError> {
            Err(DomainError::database("connection refused"))
        }
    }

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse_rfc3339(s).unwrap()
    }

    fn alice() -> UserId {
        UserId::new("alice").unwrap()
    }

    async fn gate_with(profile: Option<Profile>, now: &str) -> EntitlementGate {
        let repo = InMemoryProfileRepository::new();
        if let Some(profile) = profile {
            repo.seed(profile).await;
        }
        EntitlementGate::new(Arc::new(repo), Arc::new(FixedClock::new(ts(now))))
    }

    fn profile(tier: MembershipType, expires_at: Option<&str>) -> Profile {
        let mut profile = Profile::new_free(alice(), ts("2023-01-01T00:00:00Z"));
        profile.membership_type = tier;
        profile.membership_expires_at = expires_at.map(ts);
        profile
    }

    #[tokio::test]
    async fn anonymous_caller_is_denied() {
        let gate = gate_with(None, "2024-01-15T00:00:00Z").await;
        assert_eq!(gate.check(None).await, AccessDecision::Unauthenticated);
        assert!(!gate.has_premium_access(None).await);
    }

    #[tokio::test]
    async fn missing_profile_is_denied() {
        let gate = gate_with(None, "2024-01-15T00:00:00Z").await;
        assert_eq!(gate.check(Some(&alice())).await, AccessDecision::NoProfile);
    }

    #[tokio::test]
    async fn free_profile_is_denied_whatever_the_expiry() {
        let gate = gate_with(
            Some(profile(MembershipType::Free, Some("2030-01-01T00:00:00Z"))),
            "2024-01-15T00:00:00Z",
        )
        .await;
        assert_eq!(gate.check(Some(&alice())).await, AccessDecision::FreeTier);
    }

    #[tokio::test]
    async fn active_premium_is_granted() {
        let gate = gate_with(
            Some(profile(MembershipType::Premium, Some("2024-02-15T00:00:00Z"))),
            "2024-01-15T00:00:00Z",
        )
        .await;
        assert!(gate.has_premium_access(Some(&alice())).await);
    }

    #[tokio::test]
    async fn stale_premium_is_denied_and_untouched() {
        let repo = InMemoryProfileRepository::new();
        repo.seed(profile(MembershipType::Premium, Some("2024-01-01T00:00:00Z")))
            .await;
        let gate = EntitlementGate::new(
            Arc::new(repo.clone()),
            Arc::new(FixedClock::new(ts("2024-02-01T00:00:00Z"))),
        );

        assert_eq!(gate.check(Some(&alice())).await, AccessDecision::Expired);

        let stored = repo.find_by_user_id(&alice()).await.unwrap().unwrap();
        assert_eq!(stored.membership_type, MembershipType::Premium);
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn expiry_at_exactly_now_is_denied() {
        let gate = gate_with(
            Some(profile(MembershipType::Premium, Some("2024-02-15T00:00:00Z"))),
            "2024-02-15T00:00:00Z",
        )
        .await;
        assert!(!gate.has_premium_access(Some(&alice())).await);
    }

    #[tokio::test]
    async fn store_failure_fails_closed() {
        let gate = EntitlementGate::new(
            Arc::new(UnavailableProfiles),
            Arc::new(FixedClock::new(ts("2024-01-15T00:00:00Z"))),
        );
        assert_eq!(gate.check(Some(&alice())).await, AccessDecision::Unavailable);
        assert!(!gate.has_premium_access(Some(&alice())).await);
    }
}
