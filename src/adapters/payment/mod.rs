//! Payment confirmation adapters.
//!
//! Gateway protocols are outside this service. The simulated confirmer
//! approves every transaction; the mock scripts outcomes for tests.

mod mock_payment_confirmer;
mod simulated;

pub use mock_payment_confirmer::MockPaymentConfirmer;
pub use simulated::SimulatedPaymentConfirmer;
