//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, and error types that form the
//! vocabulary of the entitlement domain.

mod auth;
mod authorization;
mod errors;
mod ids;
mod ownership;
mod state_machine;
mod timestamp;

pub use auth::{AuthError, AuthenticatedUser};
pub use authorization::{is_admin, HasRole, Role};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{TransactionId, UserId};
pub use ownership::OwnedByUser;
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
