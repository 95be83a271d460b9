//! In-memory profile store.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::adapters::clock::SystemClock;
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::domain::membership::{Profile, ProfileUpdate};
use crate::ports::{Clock, ProfileRepository};

/// Thread-safe in-memory profile store.
///
/// Profiles are kept in a `BTreeMap` so that keyset pages come out in user id
/// order, matching the SQL store. The write lock makes every compare-and-swap
/// atomic.
#[derive(Clone)]
pub struct InMemoryProfileRepository {
    profiles: Arc<RwLock<BTreeMap<UserId, Profile>>>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryProfileRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryProfileRepository {
    /// Creates an empty store stamped with wall-clock time.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store that stamps `created_at`/`updated_at` from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            profiles: Arc::new(RwLock::new(BTreeMap::new())),
            clock,
        }
    }

    /// Inserts or replaces a profile as-is.
    pub async fn seed(&self, profile: Profile) {
        self.profiles
            .write()
            .await
            .insert(profile.user_id.clone(), profile);
    }

    /// Number of stored profiles.
    pub async fn len(&self) -> usize {
        self.profiles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.profiles.read().await.is_empty()
    }
}

#[async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn find_by_user_id(&self, user_id: &UserId) -> Result<Option<Profile>, DomainError> {
        Ok(self.profiles.read().await.get(user_id).cloned())
    }

    async fn create_default(&self, user_id: &UserId) -> Result<Profile, DomainError> {
        let mut profiles = self.profiles.write().await;
        let now = self.clock.now();
        let profile = profiles
            .entry(user_id.clone())
            .or_insert_with(|| Profile::new_free(user_id.clone(), now));
        Ok(profile.clone())
    }

    async fn update(
        &self,
        user_id: &UserId,
        expected_version: i64,
        update: ProfileUpdate,
    ) -> Result<Profile, DomainError> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles.get_mut(user_id).ok_or_else(|| {
            DomainError::new(ErrorCode::ProfileNotFound, "Profile not found")
                .with_detail("user_id", user_id.to_string())
        })?;

        if profile.version != expected_version {
            return Err(DomainError::conflict("Profile was modified concurrently")
                .with_detail("user_id", user_id.to_string())
                .with_detail("expected_version", expected_version.to_string())
                .with_detail("actual_version", profile.version.to_string()));
        }

        profile.apply(&update, self.clock.now());
        Ok(profile.clone())
    }

    async fn find_expired_premium(
        &self,
        now: &Timestamp,
        after: Option<&UserId>,
        limit: u32,
    ) -> Result<Vec<Profile>, DomainError> {
        let profiles = self.profiles.read().await;
        let lower = match after {
            Some(id) => Bound::Excluded(id.clone()),
            None => Bound::Unbounded,
        };

        Ok(profiles
            .range((lower, Bound::Unbounded))
            .map(|(_, profile)| profile)
            .filter(|profile| profile.is_sweepable(now))
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
