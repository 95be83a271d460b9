//! Authentication types for the domain layer.
//!
//! An `AuthenticatedUser` is the explicit identity capability every core
//! operation receives. The session/cookie machinery that produces it sits
//! behind the `SessionValidator` port; nothing in the core reads ambient
//! request state.

use super::UserId;
use thiserror::Error;

/// Identity resolved from a validated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// The unique user identifier issued by the auth provider.
    pub id: UserId,
}

impl AuthenticatedUser {
    /// Creates a new authenticated user.
    pub fn new(id: UserId) -> Self {
        Self { id }
    }
}

/// Authentication errors that can occur during session validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The token is missing, malformed, or unknown.
    #[error("Invalid or expired session")]
    InvalidToken,

    /// The session existed but has expired.
    #[error("Session expired")]
    TokenExpired,

    /// The session backend is unavailable.
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    /// Creates a service unavailable error with a message.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Returns true if this is a transient error that may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::ServiceUnavailable(_))
    }
}
