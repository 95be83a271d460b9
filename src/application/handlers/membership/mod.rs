//! Membership handlers.
//!
//! ## Commands
//! - Purchasing a premium period (transaction processor)
//! - Re-applying the grant of a paid transaction
//! - Sweeping expired premium profiles back to free
//!
//! ## Queries
//! - Premium access check (entitlement gate)
//! - Transaction lookup and purchase history

mod entitlement_gate;
mod get_transaction;
mod grant;
mod purchase_membership;
mod reapply_grant;
mod sweep_expired_memberships;

// Commands
pub use purchase_membership::{
    PurchaseMembershipCommand, PurchaseMembershipHandler, PurchaseMembershipResult,
};
pub use reapply_grant::{ReapplyGrantCommand, ReapplyGrantHandler};
pub use sweep_expired_memberships::{
    expired_premium_profiles, SweepExpiredMembershipsHandler, SweepFailure, SweepReport,
    DEFAULT_SWEEP_PAGE_SIZE,
};

// Queries
pub use entitlement_gate::EntitlementGate;
pub use get_transaction::{
    GetTransactionHandler, GetTransactionQuery, ListTransactionsHandler, ListTransactionsQuery,
};

pub use grant::MAX_GRANT_ATTEMPTS;
