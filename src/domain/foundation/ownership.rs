//! Ownership trait for user-owned records.
//!
//! Transactions belong to exactly one profile. Handlers that expose a
//! transaction to its caller (status lookups, grant retries) go through
//! `check_ownership` so that a foreign id looks exactly like a missing one.

use super::{DomainError, ErrorCode, UserId};

/// Trait for aggregates that have a single owner.
pub trait OwnedByUser {
    /// Returns the ID of the user who owns this resource.
    fn owner_id(&self) -> &UserId;

    /// Checks if the given user is the owner.
    fn is_owner(&self, user_id: &UserId) -> bool {
        self.owner_id() == user_id
    }

    /// Validates ownership, returning `Forbidden` if the user is not the owner.
    fn check_ownership(&self, user_id: &UserId) -> Result<(), DomainError> {
        if self.is_owner(user_id) {
            Ok(())
        } else {
            Err(
                DomainError::new(ErrorCode::Forbidden, "User does not own this resource")
                    .with_detail("owner_id", self.owner_id().to_string())
                    .with_detail("requested_by", user_id.to_string()),
            )
        }
    }
}
