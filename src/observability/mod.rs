//! Observability infrastructure
//!
//! Thread-safe routing metrics and structured logging setup.

pub mod logging;
pub mod metrics;

pub use metrics::{AgentStats, MetricsStore, RouterMetrics};
