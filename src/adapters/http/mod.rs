//! HTTP adapters - REST API implementations.
//!
//! - `entitlement` - Purchase, lookup, sweep trigger and entitlement endpoints
//! - `middleware` - Session resolution

pub mod entitlement;
pub mod middleware;

use std::time::Duration;

use axum::Router;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub use entitlement::{entitlement_router, EntitlementApiError, EntitlementAppState};
pub use middleware::{auth_middleware, AuthState, OptionalAuth, RequireAuth};

/// Assembles the full application router.
///
/// Layers, outermost first: request id, tracing, session auth. Read-only
/// routes also carry `read_timeout`; see [`entitlement_router`].
pub fn build_router(
    state: EntitlementAppState,
    sessions: AuthState,
    read_timeout: Duration,
) -> Router {
    entitlement_router(read_timeout)
        .layer(axum::middleware::from_fn_with_state(sessions, auth_middleware))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
