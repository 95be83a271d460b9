//! In-memory entitlement store.
//!
//! Used by tests and by the binary when no database URL is configured.

mod profile_repository;
mod transaction_repository;

pub use profile_repository::InMemoryProfileRepository;
pub use transaction_repository::InMemoryTransactionRepository;
