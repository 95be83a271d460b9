//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Entitlement Store
//!
//! - `ProfileRepository` - Profiles with compare-and-swap updates
//! - `TransactionRepository` - Purchase attempts and their settlement
//!
//! ## Collaborators
//!
//! - `PaymentConfirmer` - Approves or declines a recorded transaction
//! - `SessionValidator` - Resolves a session token to a user
//! - `Clock` - Current instant

mod clock;
mod payment_confirmer;
mod profile_repository;
mod session_validator;
mod transaction_repository;

pub use clock::Clock;
pub use payment_confirmer::{PaymentConfirmer, PaymentError, PaymentOutcome};
pub use profile_repository::ProfileRepository;
pub use session_validator::SessionValidator;
pub use transaction_repository::TransactionRepository;
