//! Capability-weighted agent scoring
//!
//! Scores every available agent that exposes the requested capability at or
//! above the minimum weight. The score starts at the capability weight, is
//! scaled by `priority/10` when the capability entry carries a priority, and
//! is damped by reported load when load balancing is enabled. Load damping is
//! capped at 90% so a saturated agent keeps a 10% floor and can never score
//! exactly zero.

use crate::agent::{Agent, AgentRegistry};
use std::sync::Arc;
use tracing::debug;

/// Load above this value contributes no additional damping
const MAX_LOAD_DAMPING: f64 = 0.9;

/// Transient match result; never persisted
pub struct AgentMatch {
    pub agent: Arc<dyn Agent>,
    pub score: f64,
}

impl std::fmt::Debug for AgentMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentMatch")
            .field("agent_id", &self.agent.id())
            .field("score", &self.score)
            .finish()
    }
}

/// Scores agents against a requested capability
#[derive(Debug, Clone)]
pub struct CapabilityMatcher {
    enable_load_balancing: bool,
}

impl CapabilityMatcher {
    pub fn new(enable_load_balancing: bool) -> Self {
        Self {
            enable_load_balancing,
        }
    }

    /// Find the highest-scoring available agent for a capability
    ///
    /// Ties keep the first-seen agent in registry registration order.
    pub async fn best_match(
        &self,
        registry: &AgentRegistry,
        capability: &str,
        min_weight: f64,
    ) -> Option<AgentMatch> {
        let mut best: Option<AgentMatch> = None;

        for agent in registry.list() {
            let (weight, priority) = match agent.capabilities().get(capability) {
                Some(entry) => (entry.weight, entry.priority),
                None => continue,
            };
            if weight < min_weight {
                continue;
            }
            if !agent.is_available().await {
                debug!(agent_id = %agent.id(), "Skipping unavailable agent");
                continue;
            }

            let mut score = weight;
            if let Some(priority) = priority {
                score *= f64::from(priority) / 10.0;
            }
            if self.enable_load_balancing {
                if let Some(load) = agent.current_load().await {
                    score *= 1.0 - load.min(MAX_LOAD_DAMPING);
                }
            }

            debug!(
                agent_id = %agent.id(),
                capability = %capability,
                score = score,
                "Scored candidate agent"
            );

            // Strict > keeps the first-seen agent on ties
            if best.as_ref().map_or(true, |current| score > current.score) {
                best = Some(AgentMatch { agent, score });
            }
        }

        best
    }
}
