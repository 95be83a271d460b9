//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresProfileRepository` - Profiles with version-checked updates
//! - `PostgresTransactionRepository` - Purchase attempts
//! - `connect` - Pool construction and migrations

mod pool;
mod profile_repository;
mod transaction_repository;

pub use pool::connect;
pub use profile_repository::PostgresProfileRepository;
pub use transaction_repository::PostgresTransactionRepository;
