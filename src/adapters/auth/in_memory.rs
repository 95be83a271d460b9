//! In-memory session validator.
//!
//! Holds a table of issued session tokens. Used by the development binary
//! (tokens seeded from configuration) and by the HTTP tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::SessionValidator;

/// Token table implementation of `SessionValidator`.
///
/// Unknown tokens return `InvalidToken`. Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionValidator {
    sessions: Arc<RwLock<HashMap<String, UserId>>>,
}

impl InMemorySessionValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of `insert` for test setup.
    pub async fn with_session(self, token: impl Into<String>, user_id: UserId) -> Self {
        self.insert(token, user_id).await;
        self
    }

    /// Registers a session token for `user_id`, replacing any previous owner.
    pub async fn insert(&self, token: impl Into<String>, user_id: UserId) {
        self.sessions.write().await.insert(token.into(), user_id);
    }

    /// Invalidates a token. Returns whether it existed.
    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionValidator for InMemorySessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        self.sessions
            .read()
            .await
            .get(token)
            .cloned()
            .map(AuthenticatedUser::new)
            .ok_or(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> UserId {
        UserId::new("alice").unwrap()
    }

    #[tokio::test]
    async fn known_token_resolves_to_its_user() {
        let validator = InMemorySessionValidator::new()
            .with_session("tok-1", alice())
            .await;

        let user = validator.validate("tok-1").await.unwrap();

        assert_eq!(user.id, alice());
    }

    #[tokio::test]
    async fn unknown_token_is_invalid() {
        let validator = InMemorySessionValidator::new();

        assert_eq!(
            validator.validate("nope").await,
            Err(AuthError::InvalidToken)
        );
    }

    #[tokio::test]
    async fn revoked_token_stops_validating() {
        let validator = InMemorySessionValidator::new()
            .with_session("tok-1", alice())
            .await;

        assert!(validator.revoke("tok-1").await);
        assert!(!validator.revoke("tok-1").await);
        assert!(validator.validate("tok-1").await.is_err());
        assert!(validator.is_empty().await);
    }

    #[tokio::test]
    async fn clones_share_the_table() {
        let validator = InMemorySessionValidator::new();
        let other = validator.clone();

        other.insert("tok-2", alice()).await;

        assert_eq!(validator.len().await, 1);
    }
}
