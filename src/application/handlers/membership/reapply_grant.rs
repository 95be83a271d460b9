//! ReapplyGrantHandler - Retries only the profile grant of a paid transaction.
//!
//! Used after a purchase returned `Store { step: GrantMembership }`: payment
//! went through and the transaction is `success`, but the profile was not
//! updated. Charging again would double-bill, so this re-runs the grant from
//! the stored confirmation instant instead.

use std::sync::Arc;

use tracing::info;

use crate::domain::foundation::{OwnedByUser, TransactionId, UserId};
use crate::domain::membership::{EntitlementError, Profile, StoreStep, TransactionStatus};
use crate::ports::{ProfileRepository, TransactionRepository};

use super::grant::grant_premium;

/// Command to re-apply the grant of a succeeded transaction.
#[derive(Debug, Clone)]
pub struct ReapplyGrantCommand {
    pub user_id: UserId,
    pub transaction_id: TransactionId,
}

/// Handler for grant retries. Idempotent.
pub struct ReapplyGrantHandler {
    profiles: Arc<dyn ProfileRepository>,
    transactions: Arc<dyn TransactionRepository>,
}

impl ReapplyGrantHandler {
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        transactions: Arc<dyn TransactionRepository>,
    ) -> Self {
        Self {
            profiles,
            transactions,
        }
    }

    pub async fn handle(&self, cmd: ReapplyGrantCommand) -> Result<Profile, EntitlementError> {
        let transaction = self
            .transactions
            .find_by_id(&cmd.transaction_id)
            .await
            .map_err(|e| {
                EntitlementError::store(StoreStep::LoadTransaction, Some(cmd.transaction_id), e)
            })?
            .filter(|tx| tx.is_owner(&cmd.user_id))
            .ok_or(EntitlementError::TransactionNotFound(cmd.transaction_id))?;

        if transaction.status != TransactionStatus::Success {
            return Err(EntitlementError::InvalidTransactionState {
                id: transaction.id,
                status: transaction.status.to_string(),
                expected: TransactionStatus::Success.to_string(),
            });
        }
        let confirmed_at = transaction.confirmed_at.unwrap_or(transaction.updated_at);

        let profile = self
            .profiles
            .create_default(&cmd.user_id)
            .await
            .map_err(|e| EntitlementError::store(StoreStep::LoadProfile, Some(transaction.id), e))?;

        let profile = grant_premium(self.profiles.as_ref(), profile, confirmed_at, transaction.id).await?;

        info!(
            user_id = %cmd.user_id,
            transaction_id = %transaction.id,
            "Membership grant re-applied"
        );
        Ok(profile)
    }
}
