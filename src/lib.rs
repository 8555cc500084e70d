//! Agent routing and resilience layer
//!
//! Routes requests to registered agents by explicit rules, capability-weighted
//! scoring, or a configured default, executes the winner under a timeout, and
//! recovers from failures through a circuit-breaker-gated fallback chain with
//! bounded retries.
//!
//! # Overview
//!
//! - [`AgentRouter`] - top-level entry point (`route`, `queue_request`)
//! - [`Agent`] - the three-method contract agents implement
//! - [`RoutingRule`] - explicit condition-to-target overrides
//! - [`FallbackCoordinator`] / [`CircuitBreaker`] - failure recovery
//! - [`MetricsStore`] - per-agent and global counters with online means
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use agent_dispatch::{AgentRequest, AgentRouter, RouterConfig};
//! use serde_json::json;
//!
//! # async fn example(research_agent: std::sync::Arc<dyn agent_dispatch::Agent>)
//! #     -> agent_dispatch::RouterResult<()> {
//! let router = AgentRouter::new(RouterConfig {
//!     default_agent_id: Some("research".to_string()),
//!     ..RouterConfig::default()
//! });
//! router.register_agent(research_agent);
//!
//! let request = AgentRequest::new("task", json!({
//!     "capability": "research",
//!     "query": "compare async executors",
//! }));
//! let response = router.route(&request, None).await?;
//! assert!(response.success);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod fallback;
pub mod observability;
pub mod protocol;
pub mod routing;
pub mod testing;

pub use agent::{invoke_with_timeout, Agent, AgentRegistry, Capability};
pub use config::{ConfigError, RouterConfig};
pub use error::{RouterError, RouterResult};
pub use fallback::{CircuitBreaker, CircuitState, FallbackCoordinator};
pub use observability::metrics::{AgentStats, MetricsStore, RouterMetrics};
pub use protocol::{AgentRequest, AgentResponse, RequestContext};
pub use routing::{AgentMatch, AgentRouter, CapabilityMatcher, RoutingRule, RuleCondition};
