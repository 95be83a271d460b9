//! Premium grant shared by purchase and grant retry.

use tracing::debug;

use crate::domain::foundation::{DomainError, Timestamp, TransactionId, UserId};
use crate::domain::membership::{EntitlementError, Profile, StoreStep};
use crate::ports::ProfileRepository;

/// Compare-and-swap attempts before a grant gives up on contention.
pub const MAX_GRANT_ATTEMPTS: u32 = 3;

/// Writes one premium period confirmed at `confirmed_at` onto the profile.
///
/// `profile` is the caller's last read. On a version conflict the profile is
/// re-read and the grant recomputed, up to `MAX_GRANT_ATTEMPTS` writes. An
/// update that would not change anything is skipped, which makes repeated
/// grants for the same transaction harmless.
///
/// Every failure is reported as `Store { step: GrantMembership }` carrying
/// `transaction_id`.
pub(crate) async fn grant_premium(
    profiles: &dyn ProfileRepository,
    mut profile: Profile,
    confirmed_at: Timestamp,
    transaction_id: TransactionId,
) -> Result<Profile, EntitlementError> {
    let user_id = profile.user_id.clone();
    let fail = |e: &dyn std::fmt::Display| {
        EntitlementError::store(StoreStep::GrantMembership, Some(transaction_id), e)
    };

    let mut attempt = 1;
    loop {
        let update = profile.premium_grant(confirmed_at).map_err(|e| fail(&e))?;
        if !update.changes(&profile) {
            return Ok(profile);
        }

        match profiles.update(&user_id, profile.version, update).await {
            Ok(updated) => return Ok(updated),
            Err(e) if e.is_conflict() && attempt < MAX_GRANT_ATTEMPTS => {
                debug!(
                    user_id = %user_id,
                    transaction_id = %transaction_id,
                    attempt,
                    "Profile changed during grant, retrying"
                );
                attempt += 1;
                profile = reload(profiles, &user_id).await.map_err(|e| fail(&e))?;
            }
            Err(e) => return Err(fail(&e)),
        }
    }
}

async fn reload(
    profiles: &dyn ProfileRepository,
    user_id: &UserId,
) -> Result<Profile, DomainError> {
    match profiles.find_by_user_id(user_id).await? {
        Some(profile) => Ok(profile),
        None => profiles.create_default(user_id).await,
    }
}
