//! Entitlement error taxonomy.
//!
//! Every failure a purchase, sweep, or grant retry can produce, each one
//! distinguishable so that a caller can tell "already processed" apart from
//! "try again".
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | Unauthorized | 401 |
//! | Validation | 400 |
//! | ProfileNotFound | 404 |
//! | TransactionNotFound | 404 |
//! | InvalidTransactionState | 409 |
//! | PaymentFailed | 402 |
//! | Store | 400 (purchase) / 500 (sweep) |

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, TransactionId, UserId, ValidationError};

/// The store operation that failed, so callers can choose a retry strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreStep {
    /// Inserting the pending transaction.
    RecordTransaction,

    /// Moving the transaction to `success`.
    MarkSucceeded,

    /// Moving the transaction to `failed`.
    MarkFailed,

    /// Reading a recorded transaction.
    LoadTransaction,

    /// Reading (or creating) the buyer's profile.
    LoadProfile,

    /// Writing the premium grant after the transaction succeeded.
    GrantMembership,

    /// Fetching sweep candidates.
    FetchExpired,

    /// Downgrading a stale profile.
    Downgrade,
}

impl StoreStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreStep::RecordTransaction => "record_transaction",
            StoreStep::MarkSucceeded => "mark_succeeded",
            StoreStep::MarkFailed => "mark_failed",
            StoreStep::LoadTransaction => "load_transaction",
            StoreStep::LoadProfile => "load_profile",
            StoreStep::GrantMembership => "grant_membership",
            StoreStep::FetchExpired => "fetch_expired",
            StoreStep::Downgrade => "downgrade",
        }
    }
}

impl fmt::Display for StoreStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by the entitlement handlers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntitlementError {
    /// No authenticated identity was supplied.
    #[error("Authentication required")]
    Unauthorized,

    /// The request was malformed; nothing was written.
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Profile not found for user {0}")]
    ProfileNotFound(UserId),

    /// Missing, or owned by someone else.
    #[error("Transaction {0} not found")]
    TransactionNotFound(TransactionId),

    /// The transaction is not in the state the operation requires.
    #[error("Transaction {id} is {status}, expected {expected}")]
    InvalidTransactionState {
        id: TransactionId,
        status: String,
        expected: String,
    },

    /// The payment collaborator declined or could not be reached.
    #[error("Payment failed for transaction {transaction_id}: {reason}")]
    PaymentFailed {
        transaction_id: TransactionId,
        reason: String,
    },

    /// Persistence failed at `step`.
    ///
    /// With `step == GrantMembership` the transaction is already `success`
    /// and only the profile grant needs to be retried.
    #[error("Store error during {step}: {message}")]
    Store {
        step: StoreStep,
        transaction_id: Option<TransactionId>,
        message: String,
    },
}

impl EntitlementError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        EntitlementError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn payment_failed(transaction_id: TransactionId, reason: impl Into<String>) -> Self {
        EntitlementError::PaymentFailed {
            transaction_id,
            reason: reason.into(),
        }
    }

    /// Wraps a store failure with the step it happened in.
    pub fn store(step: StoreStep, transaction_id: Option<TransactionId>, err: impl fmt::Display) -> Self {
        EntitlementError::Store {
            step,
            transaction_id,
            message: err.to_string(),
        }
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            EntitlementError::Unauthorized => ErrorCode::Unauthorized,
            EntitlementError::Validation { .. } => ErrorCode::ValidationFailed,
            EntitlementError::ProfileNotFound(_) => ErrorCode::ProfileNotFound,
            EntitlementError::TransactionNotFound(_) => ErrorCode::TransactionNotFound,
            EntitlementError::InvalidTransactionState { .. } => ErrorCode::InvalidStateTransition,
            EntitlementError::PaymentFailed { .. } => ErrorCode::PaymentFailed,
            EntitlementError::Store { .. } => ErrorCode::DatabaseError,
        }
    }

    /// Store step, for store errors.
    pub fn step(&self) -> Option<StoreStep> {
        match self {
            EntitlementError::Store { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// Transaction the error refers to, if one was already recorded.
    pub fn transaction_id(&self) -> Option<TransactionId> {
        match self {
            EntitlementError::TransactionNotFound(id)
            | EntitlementError::InvalidTransactionState { id, .. } => Some(*id),
            EntitlementError::PaymentFailed { transaction_id, .. } => Some(*transaction_id),
            EntitlementError::Store { transaction_id, .. } => *transaction_id,
            _ => None,
        }
    }

    /// Returns true if the same request may succeed when retried.
    ///
    /// A failed grant is retryable, but through `ReapplyGrantHandler` and not
    /// by purchasing again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EntitlementError::Store { .. })
    }

    /// Returns true if the payment went through but the profile was not
    /// updated.
    pub fn needs_grant_retry(&self) -> bool {
        matches!(
            self,
            EntitlementError::Store {
                step: StoreStep::GrantMembership,
                ..
            }
        )
    }
}

impl From<ValidationError> for EntitlementError {
    fn from(err: ValidationError) -> Self {
        let field = err.field().to_string();
        EntitlementError::Validation {
            field,
            message: err.to_string(),
        }
    }
}

impl From<DomainError> for EntitlementError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::Unauthorized => EntitlementError::Unauthorized,
            ErrorCode::ValidationFailed => EntitlementError::Validation {
                field: err.details.get("field").cloned().unwrap_or_default(),
                message: err.message,
            },
            ErrorCode::ProfileNotFound => match err
                .details
                .get("user_id")
                .and_then(|id| UserId::new(id.as_str()).ok())
            {
                Some(user_id) => EntitlementError::ProfileNotFound(user_id),
                None => EntitlementError::store(StoreStep::LoadProfile, None, &err),
            },
            _ => EntitlementError::Store {
                step: StoreStep::LoadProfile,
                transaction_id: None,
                message: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct_per_kind() {
        let tx = TransactionId::new();
        assert_eq!(EntitlementError::Unauthorized.code(), ErrorCode::Unauthorized);
        assert_eq!(
            EntitlementError::validation("amount", "bad").code(),
            ErrorCode::ValidationFailed
        );
        assert_eq!(
            EntitlementError::payment_failed(tx, "declined").code(),
            ErrorCode::PaymentFailed
        );
        assert_eq!(
            EntitlementError::store(StoreStep::MarkSucceeded, Some(tx), "down").code(),
            ErrorCode::DatabaseError
        );
    }

    #[test]
    fn grant_failure_needs_grant_retry() {
        let tx = TransactionId::new();
        let err = EntitlementError::store(StoreStep::GrantMembership, Some(tx), "timeout");
        assert!(err.needs_grant_retry());
        assert!(err.is_retryable());
        assert_eq!(err.transaction_id(), Some(tx));
        assert_eq!(err.step(), Some(StoreStep::GrantMembership));
    }

    #[test]
    fn validation_is_not_retryable() {
        assert!(!EntitlementError::validation("amount", "bad").is_retryable());
        assert!(!EntitlementError::Unauthorized.is_retryable());
    }

    #[test]
    fn from_validation_error_keeps_field() {
        let err: EntitlementError = ValidationError::not_positive("amount", 0).into();
        match err {
            EntitlementError::Validation { field, .. } => assert_eq!(field, "amount"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn from_domain_error_maps_database_to_store() {
        let err: EntitlementError = DomainError::database("connection reset").into();
        assert!(matches!(err, EntitlementError::Store { .. }));
    }

    #[test]
    fn from_domain_error_keeps_missing_profile() {
        let err: EntitlementError = DomainError::new(ErrorCode::ProfileNotFound, "missing")
            .with_detail("user_id", "alice")
            .into();
        assert_eq!(
            err,
            EntitlementError::ProfileNotFound(UserId::new("alice").unwrap())
        );
    }

    #[test]
    fn store_step_displays_snake_case() {
        assert_eq!(StoreStep::GrantMembership.to_string(), "grant_membership");
    }
}
