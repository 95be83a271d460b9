//! PostgreSQL implementation of TransactionRepository.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::adapters::clock::SystemClock;
use crate::domain::foundation::{
    DomainError, ErrorCode, StateMachine, Timestamp, TransactionId, UserId,
};
use crate::domain::membership::{MembershipType, Transaction, TransactionStatus};
use crate::ports::{Clock, TransactionRepository};

const TRANSACTION_COLUMNS: &str = "id, user_id, amount, membership_type, status, failure_reason, \
     created_at, updated_at, confirmed_at";

/// PostgreSQL implementation of the TransactionRepository port.
///
/// `confirmed_at` is stamped from the injected clock, not the database's,
/// since grant expiry is computed from it.
pub struct PostgresTransactionRepository {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl PostgresTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self::with_clock(pool, Arc::new(SystemClock))
    }

    pub fn with_clock(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

/// Column values for moving a pending transaction to `status`.
#[derive(Debug, PartialEq)]
struct Settlement {
    status: TransactionStatus,
    failure_reason: Option<String>,
    settled_at: DateTime<Utc>,
}

fn settlement(
    id: &TransactionId,
    status: TransactionStatus,
    failure_reason: Option<String>,
    now: Timestamp,
) -> Result<Settlement, DomainError> {
    if !TransactionStatus::Pending.can_transition_to(&status) {
        return Err(DomainError::new(
            ErrorCode::InvalidStateTransition,
            format!("Cannot move a transaction to {}", status),
        )
        .with_detail("transaction_id", id.to_string()));
    }
    let failure_reason = match status {
        TransactionStatus::Failed => failure_reason,
        _ => None,
    };
    Ok(Settlement {
        status,
        failure_reason,
        settled_at: *now.as_datetime(),
    })
}

/// Database row representation of a transaction.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    user_id: String,
    amount: i64,
    membership_type: String,
    status: String,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    confirmed_at: Option<DateTime<Utc>>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = DomainError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Transaction {
            id: TransactionId::from_uuid(row.id),
            user_id: UserId::new(row.user_id).map_err(corrupt)?,
            amount: row.amount,
            membership_type: row.membership_type.parse::<MembershipType>().map_err(corrupt)?,
            status: row.status.parse::<TransactionStatus>().map_err(corrupt)?,
            failure_reason: row.failure_reason,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            confirmed_at: row.confirmed_at.map(Timestamp::from_datetime),
        })
    }
}

fn corrupt(e: impl std::fmt::Display) -> DomainError {
    DomainError::database(format!("Invalid transaction row: {}", e))
}

fn db_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::database(format!("Failed to {}: {}", action, e))
}

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    async fn create(&self, transaction: &Transaction) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, user_id, amount, membership_type, status, failure_reason,
                created_at, updated_at, confirmed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(transaction.id.as_uuid())
        .bind(transaction.user_id.as_str())
        .bind(transaction.amount)
        .bind(transaction.membership_type.as_str())
        .bind(transaction.status.as_str())
        .bind(&transaction.failure_reason)
        .bind(transaction.created_at.as_datetime())
        .bind(transaction.updated_at.as_datetime())
        .bind(transaction.confirmed_at.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("save transaction", e))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &TransactionId) -> Result<Option<Transaction>, DomainError> {
        let row: Option<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM transactions WHERE id = $1",
            TRANSACTION_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find transaction", e))?;

        row.map(Transaction::try_from).transpose()
    }

    async fn update_status(
        &self,
        id: &TransactionId,
        status: TransactionStatus,
        failure_reason: Option<String>,
    ) -> Result<Transaction, DomainError> {
        let settle = settlement(id, status, failure_reason, self.clock.now())?;

        // Conditioned on the row still being pending.
        let row: Option<TransactionRow> = sqlx::query_as(&format!(
            r#"
            UPDATE transactions SET
                status = $2,
                failure_reason = $3,
                confirmed_at = $4,
                updated_at = $4
            WHERE id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(id.as_uuid())
        .bind(settle.status.as_str())
        .bind(settle.failure_reason)
        .bind(settle.settled_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("update transaction status", e))?;

        if let Some(row) = row {
            return Transaction::try_from(row);
        }

        match self.find_by_id(id).await? {
            None => Err(DomainError::new(ErrorCode::TransactionNotFound, "Transaction not found")
                .with_detail("transaction_id", id.to_string())),
            Some(current) => Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Transaction already {}", current.status),
            )
            .with_detail("transaction_id", id.to_string())),
        }
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Transaction>, DomainError> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM transactions WHERE user_id = $1 ORDER BY created_at DESC, id",
            TRANSACTION_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list transactions", e))?;

        rows.into_iter().map(Transaction::try_from).collect()
    }
}
