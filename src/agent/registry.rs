//! Thread-safe registry of routable agents
//!
//! Holds the long-lived set of registered agents behind an `Arc<RwLock>`.
//! Re-registering an existing id replaces the entry (last write wins) and is
//! logged at warning level. `list()` preserves first-registration order,
//! which is what capability-score tie-breaking keys on.

use crate::agent::Agent;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

#[derive(Default)]
struct RegistryInner {
    agents: HashMap<String, Arc<dyn Agent>>,
    /// First-registration order of agent ids; replacement keeps the slot
    order: Vec<String>,
}

/// Thread-safe map of agent id to agent
#[derive(Clone, Default)]
pub struct AgentRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl AgentRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace an agent
    ///
    /// Returns true when an existing entry with the same id was replaced.
    pub fn register(&self, agent: Arc<dyn Agent>) -> bool {
        let agent_id = agent.id().to_string();
        let mut inner = self.inner.write().unwrap();

        let replaced = inner.agents.insert(agent_id.clone(), agent).is_some();
        if replaced {
            warn!(agent_id = %agent_id, "Replacing already-registered agent");
        } else {
            inner.order.push(agent_id.clone());
            info!(agent_id = %agent_id, "Registered agent");
        }
        replaced
    }

    /// Remove an agent; true if an entry existed and was removed
    pub fn unregister(&self, agent_id: &str) -> bool {
        let mut inner = self.inner.write().unwrap();
        let removed = inner.agents.remove(agent_id).is_some();
        if removed {
            inner.order.retain(|id| id != agent_id);
            info!(agent_id = %agent_id, "Unregistered agent");
        } else {
            debug!(agent_id = %agent_id, "Unregister of unknown agent");
        }
        removed
    }

    /// Look up an agent by id
    pub fn get(&self, agent_id: &str) -> Option<Arc<dyn Agent>> {
        let inner = self.inner.read().unwrap();
        inner.agents.get(agent_id).cloned()
    }

    /// All registered agents in first-registration order
    pub fn list(&self) -> Vec<Arc<dyn Agent>> {
        let inner = self.inner.read().unwrap();
        inner
            .order
            .iter()
            .filter_map(|id| inner.agents.get(id).cloned())
            .collect()
    }

    /// Whether an agent with this id is registered
    pub fn contains(&self, agent_id: &str) -> bool {
        let inner = self.inner.read().unwrap();
        inner.agents.contains_key(agent_id)
    }

    /// Number of registered agents
    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap();
        inner.agents.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read().unwrap();
        f.debug_struct("AgentRegistry")
            .field("agents", &inner.order)
            .finish()
    }
}
