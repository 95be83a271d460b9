//! In-memory transaction store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::adapters::clock::SystemClock;
use crate::domain::foundation::{DomainError, ErrorCode, TransactionId, UserId};
use crate::domain::membership::{Transaction, TransactionStatus};
use crate::ports::{Clock, TransactionRepository};

/// Thread-safe in-memory transaction store.
#[derive(Clone)]
pub struct InMemoryTransactionRepository {
    transactions: Arc<RwLock<HashMap<TransactionId, Transaction>>>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryTransactionRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTransactionRepository {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store that stamps settlement times from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            transactions: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// Snapshot of every stored transaction, in no particular order.
    pub async fn all(&self) -> Vec<Transaction> {
        self.transactions.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.transactions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.transactions.read().await.is_empty()
    }
}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn create(&self, transaction: &Transaction) -> Result<(), DomainError> {
        let mut transactions = self.transactions.write().await;
        if transactions.contains_key(&transaction.id) {
            return Err(DomainError::database("Duplicate transaction id")
                .with_detail("transaction_id", transaction.id.to_string()));
        }
        transactions.insert(transaction.id, transaction.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &TransactionId) -> Result<Option<Transaction>, DomainError> {
        Ok(self.transactions.read().await.get(id).cloned())
    }

    async fn update_status(
        &self,
        id: &TransactionId,
        status: TransactionStatus,
        failure_reason: Option<String>,
    ) -> Result<Transaction, DomainError> {
        let mut transactions = self.transactions.write().await;
        let transaction = transactions.get_mut(id).ok_or_else(|| {
            DomainError::new(ErrorCode::TransactionNotFound, "Transaction not found")
                .with_detail("transaction_id", id.to_string())
        })?;

        transaction
            .settle(status, failure_reason, self.clock.now())
            .map_err(|e| {
                DomainError::new(ErrorCode::InvalidStateTransition, e.to_string())
                    .with_detail("transaction_id", id.to_string())
            })?;

        Ok(transaction.clone())
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Transaction>, DomainError> {
        let transactions = self.transactions.read().await;
        let mut owned: Vec<Transaction> = transactions
            .values()
            .filter(|tx| &tx.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;
    use crate::domain::membership::MembershipType;

    fn pending(user: &str, created_at: &str) -> Transaction {
        Transaction::new_pending(
            UserId::new(user).unwrap(),
            100_000,
            MembershipType::Premium,
            Timestamp::parse_rfc3339(created_at).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn create_then_find() {
        let repo = InMemoryTransactionRepository::new();
        let tx = pending("alice", "2024-01-15T00:00:00Z");

        repo.create(&tx).await.unwrap();

        assert_eq!(repo.find_by_id(&tx.id).await.unwrap(), Some(tx));
    }

    #[tokio::test]
    async fn duplicate_create_fails() {
        let repo = InMemoryTransactionRepository::new();
        let tx = pending("alice", "2024-01-15T00:00:00Z");
        repo.create(&tx).await.unwrap();

        assert!(repo.create(&tx).await.is_err());
    }

    #[tokio::test]
    async fn status_moves_out_of_pending_once() {
        let repo = InMemoryTransactionRepository::new();
        let tx = pending("alice", "2024-01-15T00:00:00Z");
        repo.create(&tx).await.unwrap();

        let settled = repo
            .update_status(&tx.id, TransactionStatus::Success, None)
            .await
            .unwrap();
        assert_eq!(settled.status, TransactionStatus::Success);
        assert!(settled.confirmed_at.is_some());

        let err = repo
            .update_status(&tx.id, TransactionStatus::Failed, Some("late".into()))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
        assert_eq!(
            repo.find_by_id(&tx.id).await.unwrap().unwrap().status,
            TransactionStatus::Success
        );
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let repo = InMemoryTransactionRepository::new();
        let err = repo
            .update_status(&TransactionId::new(), TransactionStatus::Success, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::TransactionNotFound);
    }

    #[tokio::test]
    async fn list_by_user_is_newest_first_and_scoped() {
        let repo = InMemoryTransactionRepository::new();
        let older = pending("alice", "2024-01-01T00:00:00Z");
        let newer = pending("alice", "2024-02-01T00:00:00Z");
        let other = pending("bob", "2024-03-01T00:00:00Z");
        for tx in [&older, &newer, &other] {
            repo.create(tx).await.unwrap();
        }

        let listed = repo
            .list_by_user(&UserId::new("alice").unwrap())
            .await
            .unwrap();

        assert_eq!(listed, vec![newer, older]);
    }
}
