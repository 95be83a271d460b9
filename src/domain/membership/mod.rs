//! Membership domain module.
//!
//! Profiles carry the cached entitlement; transactions record purchase
//! attempts that move a profile to premium.
//!
//! # Module Structure
//!
//! - `access` - AccessDecision returned by the entitlement gate
//! - `errors` - EntitlementError taxonomy and StoreStep
//! - `profile` - Profile aggregate and ProfileUpdate
//! - `tier` - MembershipType (free | premium)
//! - `transaction` - Transaction aggregate and TransactionStatus state machine

mod access;
mod errors;
mod profile;
mod tier;
mod transaction;

pub use access::AccessDecision;
pub use errors::{EntitlementError, StoreStep};
pub use profile::{Profile, ProfileUpdate, PREMIUM_PERIOD_MONTHS};
pub use tier::MembershipType;
pub use transaction::{Transaction, TransactionStatus};
