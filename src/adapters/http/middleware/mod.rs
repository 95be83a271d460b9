//! HTTP middleware for axum.
//!
//! - `auth` - Session resolution middleware and extractors

pub mod auth;

pub use auth::{
    auth_middleware, session_token, AuthRejection, AuthState, OptionalAuth, RequireAuth,
    SESSION_COOKIE,
};
