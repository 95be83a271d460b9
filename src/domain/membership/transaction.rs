//! Transaction aggregate and its status state machine.
//!
//! One transaction per purchase attempt. A transaction is born `Pending` and
//! leaves that state exactly once, to `Success` or `Failed`; after that it is
//! immutable.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::foundation::{
    OwnedByUser, StateMachine, Timestamp, TransactionId, UserId, ValidationError,
};

use super::MembershipType;

/// Payment attempt status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Recorded, payment not yet confirmed.
    Pending,

    /// Payment confirmed; the membership grant is owed.
    Success,

    /// Payment declined or confirmation failed.
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Success => "success",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "success" => Ok(TransactionStatus::Success),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown transaction status '{}'", other),
            )),
        }
    }
}

impl StateMachine for TransactionStatus {
    fn valid_transitions(&self) -> Vec<Self> {
        match self {
            TransactionStatus::Pending => {
                vec![TransactionStatus::Success, TransactionStatus::Failed]
            }
            TransactionStatus::Success | TransactionStatus::Failed => vec![],
        }
    }
}

/// A single purchase attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,

    /// Amount in minor currency units, strictly positive.
    pub amount: i64,

    /// Tier being purchased.
    pub membership_type: MembershipType,

    pub status: TransactionStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,

    /// Instant the status left `Pending`.
    pub confirmed_at: Option<Timestamp>,

    /// Why the payment failed, for `Failed` transactions.
    pub failure_reason: Option<String>,
}

impl Transaction {
    /// Creates a pending transaction after validating the amount.
    pub fn new_pending(
        user_id: UserId,
        amount: i64,
        membership_type: MembershipType,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        if amount <= 0 {
            return Err(ValidationError::not_positive("amount", amount));
        }
        Ok(Self {
            id: TransactionId::new(),
            user_id,
            amount,
            membership_type,
            status: TransactionStatus::Pending,
            created_at: now,
            updated_at: now,
            confirmed_at: None,
            failure_reason: None,
        })
    }

    /// Moves the transaction out of `Pending`.
    ///
    /// Fails if the transaction has already settled or `target` is `Pending`.
    pub fn settle(
        &mut self,
        target: TransactionStatus,
        reason: Option<String>,
        now: Timestamp,
    ) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(target)?;
        self.confirmed_at = Some(now);
        self.updated_at = now;
        self.failure_reason = match target {
            TransactionStatus::Failed => reason,
            _ => None,
        };
        Ok(())
    }

    pub fn is_settled(&self) -> bool {
        self.status.is_terminal()
    }
}

impl OwnedByUser for Transaction {
    fn owner_id(&self) -> &UserId {
        &self.user_id
    }
}
