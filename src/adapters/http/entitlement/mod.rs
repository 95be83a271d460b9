//! HTTP adapter for entitlement endpoints.
//!
//! - `POST /transactions` - Purchase a premium period
//! - `GET /transactions` - Purchase history
//! - `GET /transactions/:id` - Transaction status
//! - `POST /transactions/:id/reapply` - Retry a failed grant
//! - `POST /subscriptions/check-expiry` - Trigger a sweep pass
//! - `GET /me/entitlement` - Premium access decision
//! - `GET /health` - Liveness

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{EntitlementApiError, EntitlementAppState, SCHEDULER_TOKEN_HEADER};
pub use routes::entitlement_router;
