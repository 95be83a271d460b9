//! Transaction repository port.
//!
//! The other half of the entitlement store: one row per purchase attempt.
//! Rows are append-only apart from the single status move out of `pending`.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, TransactionId, UserId};
use crate::domain::membership::{Transaction, TransactionStatus};

/// Repository port for transaction persistence.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Insert a new (pending) transaction.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure or duplicate id
    async fn create(&self, transaction: &Transaction) -> Result<(), DomainError>;

    /// Find a transaction by id.
    async fn find_by_id(&self, id: &TransactionId) -> Result<Option<Transaction>, DomainError>;

    /// Move a pending transaction to `status`.
    ///
    /// The write is conditioned on the stored status still being `pending`.
    ///
    /// # Errors
    ///
    /// - `TransactionNotFound` if no transaction exists
    /// - `InvalidStateTransition` if it already settled or `status` is pending
    /// - `DatabaseError` on persistence failure
    async fn update_status(
        &self,
        id: &TransactionId,
        status: TransactionStatus,
        failure_reason: Option<String>,
    ) -> Result<Transaction, DomainError>;

    /// All transactions of a user, newest first.
    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Transaction>, DomainError>;
}
