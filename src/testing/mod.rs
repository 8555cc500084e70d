//! Testing utilities
//!
//! Scripted agent implementations for exercising the router without real
//! agent backends.

pub mod mocks;
