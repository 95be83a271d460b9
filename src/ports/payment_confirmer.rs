//! Payment confirmation port.
//!
//! The purchase flow treats payment as an external collaborator that either
//! approves or declines a recorded transaction. Gateway protocols live behind
//! implementations of this port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::membership::Transaction;

/// Confirms payment for a pending transaction.
#[async_trait]
pub trait PaymentConfirmer: Send + Sync {
    /// Confirm payment for `transaction`.
    ///
    /// `Ok(Declined)` is a definitive answer; `Err` means the collaborator
    /// could not be asked.
    async fn confirm(&self, transaction: &Transaction) -> Result<PaymentOutcome, PaymentError>;
}

/// Definitive answer from the payment collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PaymentOutcome {
    Approved,
    Declined { reason: String },
}

impl PaymentOutcome {
    pub fn declined(reason: impl Into<String>) -> Self {
        PaymentOutcome::Declined {
            reason: reason.into(),
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, PaymentOutcome::Approved)
    }
}

/// Errors from the payment collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentError {
    /// Network connectivity issue.
    #[error("Payment network error: {0}")]
    Network(String),

    /// The collaborator answered with something unusable.
    #[error("Payment provider error: {0}")]
    Provider(String),
}

impl PaymentError {
    pub fn network(message: impl Into<String>) -> Self {
        PaymentError::Network(message.into())
    }

    pub fn provider(message: impl Into<String>) -> Self {
        PaymentError::Provider(message.into())
    }
}
