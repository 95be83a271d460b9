//! Transaction queries scoped to the caller.
//!
//! A client that timed out on a purchase looks the transaction up here
//! before deciding to buy again, so a paid attempt is never charged twice.

use std::sync::Arc;

use crate::domain::foundation::{OwnedByUser, TransactionId, UserId};
use crate::domain::membership::{EntitlementError, StoreStep, Transaction};
use crate::ports::TransactionRepository;

/// Query for one transaction of the caller.
#[derive(Debug, Clone)]
pub struct GetTransactionQuery {
    pub user_id: UserId,
    pub transaction_id: TransactionId,
}

/// Handler for single-transaction lookups.
pub struct GetTransactionHandler {
    transactions: Arc<dyn TransactionRepository>,
}

impl GetTransactionHandler {
    pub fn new(transactions: Arc<dyn TransactionRepository>) -> Self {
        Self { transactions }
    }

    /// Returns the transaction, or `TransactionNotFound` if it is missing or
    /// owned by someone else.
    pub async fn handle(&self, query: GetTransactionQuery) -> Result<Transaction, EntitlementError> {
        self.transactions
            .find_by_id(&query.transaction_id)
            .await
            .map_err(|e| {
                EntitlementError::store(StoreStep::LoadTransaction, Some(query.transaction_id), e)
            })?
            .filter(|tx| tx.check_ownership(&query.user_id).is_ok())
            .ok_or(EntitlementError::TransactionNotFound(query.transaction_id))
    }
}

/// Query for the caller's purchase history.
#[derive(Debug, Clone)]
pub struct ListTransactionsQuery {
    pub user_id: UserId,
}

/// Handler listing a user's transactions, newest first.
pub struct ListTransactionsHandler {
    transactions: Arc<dyn TransactionRepository>,
}

impl ListTransactionsHandler {
    pub fn new(transactions: Arc<dyn TransactionRepository>) -> Self {
        Self { transactions }
    }

    pub async fn handle(
        &self,
        query: ListTransactionsQuery,
    ) -> Result<Vec<Transaction>, EntitlementError> {
        self.transactions
            .list_by_user(&query.user_id)
            .await
            .map_err(|e| EntitlementError::store(StoreStep::LoadTransaction, None, e))
    }
}
