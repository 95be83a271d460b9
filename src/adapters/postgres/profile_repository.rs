//! PostgreSQL implementation of ProfileRepository.
//!
//! Updates are compare-and-swap on the `version` column: the `WHERE` clause
//! names the version the caller read, and zero affected rows means either
//! the row is gone or someone else wrote first.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::adapters::clock::SystemClock;
use crate::domain::foundation::{DomainError, ErrorCode, Role, Timestamp, UserId};
use crate::domain::membership::{MembershipType, Profile, ProfileUpdate};
use crate::ports::{Clock, ProfileRepository};

const PROFILE_COLUMNS: &str = "user_id, role, membership_type, membership_expires_at, \
     membership_started_at, created_at, updated_at, version";

/// PostgreSQL implementation of the ProfileRepository port.
pub struct PostgresProfileRepository {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl PostgresProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self::with_clock(pool, Arc::new(SystemClock))
    }

    pub fn with_clock(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

/// Database row representation of a profile.
#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    user_id: String,
    role: String,
    membership_type: String,
    membership_expires_at: Option<DateTime<Utc>>,
    membership_started_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = DomainError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(Profile {
            user_id: UserId::new(row.user_id).map_err(corrupt)?,
            role: row.role.parse::<Role>().map_err(corrupt)?,
            membership_type: row.membership_type.parse::<MembershipType>().map_err(corrupt)?,
            membership_expires_at: row.membership_expires_at.map(Timestamp::from_datetime),
            membership_started_at: row.membership_started_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            version: row.version,
        })
    }
}

fn corrupt(e: impl std::fmt::Display) -> DomainError {
    DomainError::database(format!("Invalid profile row: {}", e))
}

fn db_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::database(format!("Failed to {}: {}", action, e))
}

#[async_trait]
impl ProfileRepository for PostgresProfileRepository {
    async fn find_by_user_id(&self, user_id: &UserId) -> Result<Option<Profile>, DomainError> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {} FROM profiles WHERE user_id = $1",
            PROFILE_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find profile", e))?;

        row.map(Profile::try_from).transpose()
    }

    async fn create_default(&self, user_id: &UserId) -> Result<Profile, DomainError> {
        let now = *self.clock.now().as_datetime();

        // The no-op DO UPDATE makes RETURNING yield the existing row too.
        let row: ProfileRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO profiles (user_id, role, membership_type, created_at, updated_at, version)
            VALUES ($1, 'user', 'free', $2, $2, 1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        ))
        .bind(user_id.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("create profile", e))?;

        Profile::try_from(row)
    }

    async fn update(
        &self,
        user_id: &UserId,
        expected_version: i64,
        update: ProfileUpdate,
    ) -> Result<Profile, DomainError> {
        // $n_set flags distinguish "leave as is" from "set to NULL".
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            r#"
            UPDATE profiles SET
                membership_type = COALESCE($3, membership_type),
                membership_expires_at = CASE WHEN $4 THEN $5 ELSE membership_expires_at END,
                membership_started_at = CASE WHEN $6 THEN $7 ELSE membership_started_at END,
                updated_at = $8,
                version = version + 1
            WHERE user_id = $1 AND version = $2
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        ))
        .bind(user_id.as_str())
        .bind(expected_version)
        .bind(update.membership_type.map(|t| t.as_str()))
        .bind(update.membership_expires_at.is_some())
        .bind(update.membership_expires_at.flatten().map(|t| *t.as_datetime()))
        .bind(update.membership_started_at.is_some())
        .bind(update.membership_started_at.flatten().map(|t| *t.as_datetime()))
        .bind(*self.clock.now().as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("update profile", e))?;

        if let Some(row) = row {
            return Profile::try_from(row);
        }

        // Nothing matched: tell a missing row from a moved version.
        let current: Option<i64> =
            sqlx::query_scalar("SELECT version FROM profiles WHERE user_id = $1")
                .bind(user_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("read profile version", e))?;

        match current {
            None => Err(DomainError::new(ErrorCode::ProfileNotFound, "Profile not found")
                .with_detail("user_id", user_id.to_string())),
            Some(actual) => Err(DomainError::conflict("Profile was modified concurrently")
                .with_detail("user_id", user_id.to_string())
                .with_detail("expected_version", expected_version.to_string())
                .with_detail("actual_version", actual.to_string())),
        }
    }

    async fn find_expired_premium(
        &self,
        now: &Timestamp,
        after: Option<&UserId>,
        limit: u32,
    ) -> Result<Vec<Profile>, DomainError> {
        let rows: Vec<ProfileRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM profiles
            WHERE membership_type = 'premium'
              AND membership_expires_at IS NOT NULL
              AND membership_expires_at < $1
              AND ($2::TEXT IS NULL OR user_id > $2)
            ORDER BY user_id
            LIMIT $3
            "#,
            PROFILE_COLUMNS
        ))
        .bind(now.as_datetime())
        .bind(after.map(|id| id.as_str()))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("find expired profiles", e))?;

        rows.into_iter().map(Profile::try_from).collect()
    }
}
