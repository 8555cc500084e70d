//! Routing decision layer
//!
//! Explicit rule overrides, capability-weighted matching, and the top-level
//! [`AgentRouter`] entry point.

pub mod matcher;
pub mod router;
pub mod rules;

pub use matcher::{AgentMatch, CapabilityMatcher};
pub use router::AgentRouter;
pub use rules::{RoutingRule, RuleCondition};
