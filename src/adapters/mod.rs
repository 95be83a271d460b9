//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `clock` - System and fixed clocks
//! - `memory` - In-memory entitlement store
//! - `postgres` - PostgreSQL entitlement store
//! - `payment` - Payment confirmation
//! - `auth` - Session validation
//! - `http` - Axum REST surface

pub mod auth;
pub mod clock;
pub mod http;
pub mod memory;
pub mod payment;
pub mod postgres;
