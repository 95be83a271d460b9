//! Authentication adapters - Implementations of the `SessionValidator` port.
//!
//! - `InMemorySessionValidator` - Token table for development and tests

mod in_memory;

pub use in_memory::InMemorySessionValidator;
