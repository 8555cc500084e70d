//! Agent contract and registry
//!
//! An agent is any component satisfying the three-method behavioral contract:
//! `handle` is mandatory, `is_available` and `current_load` are optional
//! capabilities with safe defaults. The router requires nothing else from an
//! agent implementation.

pub mod registry;

pub use registry::AgentRegistry;

use crate::error::{RouterError, RouterResult};
use crate::protocol::{AgentRequest, AgentResponse, RequestContext};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// A named skill an agent claims, with a relevance weight
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Capability {
    /// Relevance weight in 0.0..=1.0
    pub weight: f64,
    /// Optional priority multiplier (score is scaled by priority/10)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    /// Optional opaque metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl Capability {
    /// Capability with a weight and no priority or metadata
    pub fn weighted(weight: f64) -> Self {
        Self {
            weight,
            priority: None,
            metadata: None,
        }
    }

    /// Set the priority multiplier
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// Agent trait for dependency injection and routing
///
/// Implementations must be cheap to query: `capabilities()` is consulted on
/// every capability-routed request, and `is_available()` before every
/// selection.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Unique agent identifier within a registry
    fn id(&self) -> &str;

    /// Human-readable agent name
    fn name(&self) -> &str;

    /// Description of what this agent does
    fn description(&self) -> &str {
        ""
    }

    /// Capabilities this agent claims, keyed by capability name
    fn capabilities(&self) -> &HashMap<String, Capability>;

    /// Whether the agent can currently accept work
    async fn is_available(&self) -> bool {
        true
    }

    /// Current utilization in 0.0..=1.0, if the agent tracks load
    async fn current_load(&self) -> Option<f64> {
        None
    }

    /// Per-agent override of the global request timeout
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Handle a routed request - the unit of work
    async fn handle(
        &self,
        request: &AgentRequest,
        context: Option<&RequestContext>,
    ) -> RouterResult<AgentResponse>;
}

/// Invoke an agent under the timeout race
///
/// The call is raced against a timer of the agent's own timeout, falling back
/// to `default_timeout`. Whichever settles first wins; the loser is dropped.
/// A timeout yields a typed [`RouterError::Timeout`] distinguishable from an
/// agent-raised error.
///
/// No cancellation token is propagated into `handle`; dropping the future
/// cancels it at its next await point, but an agent blocked outside the async
/// runtime may still run to completion in the background. Best-effort only.
pub async fn invoke_with_timeout(
    agent: &Arc<dyn Agent>,
    request: &AgentRequest,
    context: Option<&RequestContext>,
    default_timeout: Duration,
) -> RouterResult<AgentResponse> {
    let timeout = agent.timeout().unwrap_or(default_timeout);

    match tokio::time::timeout(timeout, agent.handle(request, context)).await {
        Ok(result) => result,
        Err(_) => Err(RouterError::timeout(agent.id(), timeout.as_millis() as u64)),
    }
}
