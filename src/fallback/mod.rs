//! Failure recovery layer
//!
//! The [`FallbackCoordinator`] walks an ordered list of backup agents with
//! bounded retries after a primary failure, gated by a single shared
//! [`CircuitBreaker`] that reflects the health of the fallback path as a
//! whole.

pub mod circuit;
pub mod coordinator;

pub use circuit::{CircuitBreaker, CircuitState};
pub use coordinator::FallbackCoordinator;
