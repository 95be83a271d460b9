//! Session validation port.
//!
//! Turns the opaque session token carried by a request (bearer header or
//! session cookie) into an explicit `AuthenticatedUser`. Core operations only
//! ever see the resolved identity.
//!
//! # Example Implementation
//!
//! ```ignore
//! pub struct HostedSessionValidator { ... }
//!
//! #[async_trait]
//! impl SessionValidator for HostedSessionValidator {
//!     async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
//!         // 1. Look the session up with the auth backend
//!         // 2. Reject expired sessions
//!         // 3. Map the session owner to AuthenticatedUser
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::domain::foundation::{AuthenticatedUser, AuthError};

/// Validates session tokens and extracts user identity.
///
/// # Contract
///
/// Implementations must:
/// - Return `AuthError::InvalidToken` for unknown or malformed tokens
/// - Return `AuthError::TokenExpired` for expired sessions
/// - Return `AuthError::ServiceUnavailable` for transient errors
#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Validate a session token and return the authenticated user.
    ///
    /// `token` is the raw value, without any "Bearer " prefix or cookie name.
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}
