//! Profile repository port.
//!
//! Half of the entitlement store: durable profile rows keyed by user id.
//!
//! # Design
//!
//! - **Compare-and-swap**: every update names the version it was computed
//!   from; a moved version is reported as `ConcurrencyConflict` instead of
//!   being overwritten
//! - **Keyset paging**: sweep candidates are fetched in pages ordered by user
//!   id, so a large stale set never has to be held in memory
//! - **No business rules**: the entitlement rule lives on `Profile`
//!
//! # Example
//!
//! ```ignore
//! let profile = repo.create_default(&user_id).await?;
//! let update = profile.premium_grant(confirmed_at)?;
//! let updated = repo.update(&user_id, profile.version, update).await?;
//! ```

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::domain::membership::{Profile, ProfileUpdate};

/// Repository port for profile persistence.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Find a profile by user id.
    ///
    /// Returns `None` if the user has never authenticated.
    async fn find_by_user_id(&self, user_id: &UserId) -> Result<Option<Profile>, DomainError>;

    /// Create the default free profile, or return the existing one.
    ///
    /// Idempotent: concurrent first-authentication calls all observe the same
    /// row.
    async fn create_default(&self, user_id: &UserId) -> Result<Profile, DomainError>;

    /// Apply a partial update if the stored version equals `expected_version`.
    ///
    /// Bumps the version and `updated_at`, and returns the stored profile.
    ///
    /// # Errors
    ///
    /// - `ProfileNotFound` if no profile exists
    /// - `ConcurrencyConflict` if the version moved
    /// - `DatabaseError` on persistence failure
    async fn update(
        &self,
        user_id: &UserId,
        expected_version: i64,
        update: ProfileUpdate,
    ) -> Result<Profile, DomainError>;

    /// Fetch one page of premium profiles whose expiry is strictly before
    /// `now`, ordered by user id and starting after `after`.
    ///
    /// A page shorter than `limit` is the last one.
    async fn find_expired_premium(
        &self,
        now: &Timestamp,
        after: Option<&UserId>,
        limit: u32,
    ) -> Result<Vec<Profile>, DomainError>;
}
