//! Axum router configuration for entitlement endpoints.

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::timeout::TimeoutLayer;

use super::handlers::{
    check_expiry, create_transaction, get_transaction, health, list_transactions, my_entitlement,
    reapply_grant, EntitlementAppState,
};

/// Create the entitlement API router.
///
/// # Routes
///
/// ## User Endpoints (session required unless noted)
/// - `POST /transactions` - Purchase a premium period
/// - `GET /transactions` - Purchase history, newest first
/// - `GET /transactions/:id` - One transaction's status
/// - `POST /transactions/:id/reapply` - Retry the profile grant
/// - `GET /me/entitlement` - Gate decision (anonymous allowed)
///
/// ## Scheduler Endpoints (scheduler token when configured)
/// - `POST /subscriptions/check-expiry` - Run one sweep pass
///
/// ## Health
/// - `GET /health`
///
/// `read_timeout` bounds the read-only routes. Purchase, reapply and sweep
/// routes have no deadline: answering 408 halfway through would hide which
/// step the request reached.
pub fn entitlement_router(read_timeout: Duration) -> Router<EntitlementAppState> {
    let deadline = TimeoutLayer::new(read_timeout);

    Router::new()
        .route(
            "/transactions",
            post(create_transaction).merge(get(list_transactions).layer(deadline.clone())),
        )
        .route("/transactions/:id", get(get_transaction).layer(deadline.clone()))
        .route("/transactions/:id/reapply", post(reapply_grant))
        .route("/subscriptions/check-expiry", post(check_expiry))
        .route("/me/entitlement", get(my_entitlement).layer(deadline.clone()))
        .route("/health", get(health).layer(deadline))
}
