//! PurchaseMembershipHandler - Command handler for buying a premium period.
//!
//! Flow:
//! 1. Validate identity, amount and tier (no store access)
//! 2. Load or create the buyer's profile
//! 3. Record a pending transaction
//! 4. Confirm payment
//! 5. Mark the transaction succeeded or failed
//! 6. On success, grant premium until `confirmed_at + 1 month`
//!
//! Once step 5 marks the transaction succeeded there is no rollback. A grant
//! failure is returned as `Store { step: GrantMembership }` with the
//! transaction id so that only the grant is retried.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::foundation::{Timestamp, UserId, ValidationError};
use crate::domain::membership::{
    EntitlementError, MembershipType, Profile, StoreStep, Transaction, TransactionStatus,
};
use crate::ports::{Clock, PaymentConfirmer, PaymentOutcome, ProfileRepository, TransactionRepository};

use super::grant::grant_premium;

/// Command to purchase a membership tier.
#[derive(Debug, Clone)]
pub struct PurchaseMembershipCommand {
    /// Resolved caller identity; `None` when the request carried no session.
    pub user_id: Option<UserId>,

    /// Amount in minor currency units.
    pub amount: i64,

    /// Requested tier, as sent by the client.
    pub membership_type: String,
}

/// Result of a successful purchase.
#[derive(Debug, Clone)]
pub struct PurchaseMembershipResult {
    /// The settled (`success`) transaction.
    pub transaction: Transaction,

    /// The profile after the grant.
    pub profile: Profile,

    /// Expiry now stored on the profile.
    pub membership_expires_at: Option<Timestamp>,
}

/// Handler for membership purchases (the transaction processor).
pub struct PurchaseMembershipHandler {
    profiles: Arc<dyn ProfileRepository>,
    transactions: Arc<dyn TransactionRepository>,
    payments: Arc<dyn PaymentConfirmer>,
    clock: Arc<dyn Clock>,
}

impl PurchaseMembershipHandler {
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        transactions: Arc<dyn TransactionRepository>,
        payments: Arc<dyn PaymentConfirmer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            profiles,
            transactions,
            payments,
            clock,
        }
    }

    pub async fn handle(
        &self,
        cmd: PurchaseMembershipCommand,
    ) -> Result<PurchaseMembershipResult, EntitlementError> {
        // 1. Validate before touching the store
        let user_id = cmd.user_id.ok_or(EntitlementError::Unauthorized)?;
        if cmd.amount <= 0 {
            return Err(ValidationError::not_positive("amount", cmd.amount).into());
        }
        let tier: MembershipType = cmd.membership_type.parse()?;
        if !tier.is_paid() {
            return Err(EntitlementError::validation(
                "membership_type",
                format!("'{}' cannot be purchased", tier),
            ));
        }

        // 2. First authentication creates the default profile
        let profile = self
            .profiles
            .create_default(&user_id)
            .await
            .map_err(|e| EntitlementError::store(StoreStep::LoadProfile, None, e))?;

        // 3. Record pending transaction
        let transaction = Transaction::new_pending(user_id.clone(), cmd.amount, tier, self.clock.now())?;
        self.transactions
            .create(&transaction)
            .await
            .map_err(|e| EntitlementError::store(StoreStep::RecordTransaction, None, e))?;
        let transaction_id = transaction.id;

        // 4. Confirm payment
        let declined_reason = match self.payments.confirm(&transaction).await {
            Ok(PaymentOutcome::Approved) => None,
            Ok(PaymentOutcome::Declined { reason }) => Some(reason),
            Err(e) => Some(e.to_string()),
        };

        // 5a. Declined or unreachable: mark failed, profile untouched
        if let Some(reason) = declined_reason {
            if let Err(e) = self
                .transactions
                .update_status(&transaction_id, TransactionStatus::Failed, Some(reason.clone()))
                .await
            {
                warn!(
                    user_id = %user_id,
                    transaction_id = %transaction_id,
                    error = %e,
                    "Failed to mark declined transaction as failed"
                );
                return Err(EntitlementError::store(
                    StoreStep::MarkFailed,
                    Some(transaction_id),
                    e,
                ));
            }
            info!(
                user_id = %user_id,
                transaction_id = %transaction_id,
                reason = %reason,
                "Payment declined"
            );
            return Err(EntitlementError::payment_failed(transaction_id, reason));
        }

        // 5b. Approved: mark succeeded
        let transaction = self
            .transactions
            .update_status(&transaction_id, TransactionStatus::Success, None)
            .await
            .map_err(|e| EntitlementError::store(StoreStep::MarkSucceeded, Some(transaction_id), e))?;
        let confirmed_at = transaction.confirmed_at.unwrap_or(transaction.updated_at);

        // 6. Grant premium
        let profile = match grant_premium(self.profiles.as_ref(), profile, confirmed_at, transaction_id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(
                    user_id = %user_id,
                    transaction_id = %transaction_id,
                    error = %e,
                    "Transaction succeeded but membership grant failed"
                );
                return Err(e);
            }
        };

        info!(
            user_id = %user_id,
            transaction_id = %transaction_id,
            amount = transaction.amount,
            expires_at = ?profile.membership_expires_at.map(|t| t.to_string()),
            "Membership purchased"
        );

        Ok(PurchaseMembershipResult {
            membership_expires_at: profile.membership_expires_at,
            transaction,
            profile,
        })
    }
}
