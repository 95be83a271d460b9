//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, enums, errors)
//! - `membership` - Profiles, transactions, and the entitlement rule

pub mod foundation;
pub mod membership;
