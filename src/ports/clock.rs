//! Clock port.
//!
//! Handlers never read the system time directly; expiry arithmetic and the
//! entitlement rule are evaluated against an injected clock.

use crate::domain::foundation::Timestamp;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}
