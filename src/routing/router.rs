//! Top-level request router
//!
//! The [`AgentRouter`] owns the registry, rule set, capability matcher,
//! fallback coordinator, and metrics store, and exposes the `route` entry
//! point plus a serialized queue mode.
//!
//! Routing order, first success wins: explicit rules by descending priority,
//! then capability-weighted matching, then the configured default agent.
//! The winner is invoked under the timeout race; on failure the fallback
//! coordinator takes over with the default agent as the fallback chain.

use crate::agent::{invoke_with_timeout, Agent, AgentRegistry};
use crate::config::RouterConfig;
use crate::error::{RouterError, RouterResult};
use crate::fallback::{CircuitState, FallbackCoordinator};
use crate::observability::metrics::{MetricsStore, RouterMetrics};
use crate::protocol::{AgentRequest, AgentResponse, RequestContext};
use crate::routing::matcher::CapabilityMatcher;
use crate::routing::rules::{RoutingRule, RuleSet};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn, Instrument};

/// Why an agent was selected for a request
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionReason {
    /// Matched an explicit routing rule at this priority
    Rule { priority: i32 },
    /// Won the capability pass with this score
    Capability { score: f64 },
    /// Fell through to the configured default agent
    Default,
}

impl std::fmt::Display for SelectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionReason::Rule { priority } => {
                write!(f, "matched routing rule at priority {priority}")
            }
            SelectionReason::Capability { score } => {
                write!(f, "capability match with score {score:.3}")
            }
            SelectionReason::Default => write!(f, "default agent"),
        }
    }
}

struct QueuedRequest {
    request: AgentRequest,
    context: Option<RequestContext>,
    reply: oneshot::Sender<RouterResult<AgentResponse>>,
}

/// Routes requests to registered agents with fallback and metrics
///
/// `route` calls may run concurrently; no global lock is held around agent
/// invocations. Cancellation is best-effort: a timed-out `handle` future is
/// dropped (cancelling it at its next await point), but no explicit token is
/// propagated to the agent.
pub struct AgentRouter {
    config: RouterConfig,
    registry: AgentRegistry,
    rules: RwLock<RuleSet>,
    matcher: CapabilityMatcher,
    fallback: FallbackCoordinator,
    metrics: Arc<MetricsStore>,
    queue_tx: Mutex<Option<mpsc::UnboundedSender<QueuedRequest>>>,
}

impl AgentRouter {
    /// Create a router with its own registry and metrics store
    pub fn new(config: RouterConfig) -> Self {
        Self::with_registry(config, AgentRegistry::new(), Arc::new(MetricsStore::new()))
    }

    /// Create a router around an existing registry and metrics store
    pub fn with_registry(
        config: RouterConfig,
        registry: AgentRegistry,
        metrics: Arc<MetricsStore>,
    ) -> Self {
        Self {
            matcher: CapabilityMatcher::new(config.enable_load_balancing),
            fallback: FallbackCoordinator::new(&config, Arc::clone(&metrics)),
            config,
            registry,
            rules: RwLock::new(RuleSet::new()),
            metrics,
            queue_tx: Mutex::new(None),
        }
    }

    /// Register an agent and initialize its stats entry
    pub fn register_agent(&self, agent: Arc<dyn Agent>) {
        let agent_id = agent.id().to_string();
        self.registry.register(agent);
        self.metrics.init_agent(&agent_id);
    }

    /// Unregister an agent, dropping its stats; true if it existed
    pub fn unregister_agent(&self, agent_id: &str) -> bool {
        let removed = self.registry.unregister(agent_id);
        if removed {
            self.metrics.drop_agent(agent_id);
        }
        removed
    }

    /// The registry backing this router
    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Add a routing rule
    pub fn add_rule(&self, rule: RoutingRule) {
        self.rules.write().unwrap().add(rule);
    }

    /// Remove every rule matching the predicate; returns how many were removed
    pub fn remove_rules_where(&self, predicate: impl Fn(&RoutingRule) -> bool) -> usize {
        self.rules.write().unwrap().remove_where(predicate)
    }

    /// Snapshot of current metrics
    pub fn metrics(&self) -> RouterMetrics {
        self.metrics.snapshot()
    }

    /// Zero all metrics, preserving agent keys
    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    /// Current state of the fallback circuit breaker
    pub fn circuit_state(&self) -> CircuitState {
        self.fallback.circuit_state()
    }

    /// The fallback coordinator owned by this router
    pub fn fallback(&self) -> &FallbackCoordinator {
        &self.fallback
    }

    /// Route a request to the best agent and execute it
    ///
    /// Selection order: rules, capability match, default agent. Failures of
    /// the selected agent engage the fallback coordinator (default agent as
    /// the chain) when fallback is enabled; otherwise the original error is
    /// re-raised. Metrics are updated on every outcome before returning.
    pub async fn route(
        &self,
        request: &AgentRequest,
        context: Option<&RequestContext>,
    ) -> RouterResult<AgentResponse> {
        let span = crate::route_span!(
            request_id = %request.id,
            request_type = %request.request_type,
        );
        self.route_inner(request, context).instrument(span).await
    }

    async fn route_inner(
        &self,
        request: &AgentRequest,
        context: Option<&RequestContext>,
    ) -> RouterResult<AgentResponse> {
        let Some((agent, reason)) = self.select_agent(request, context).await else {
            self.metrics.record_route_rejected();
            warn!(request_id = %request.id, "No suitable agent for request");
            return Err(RouterError::no_suitable_agent(request.id));
        };

        info!(
            request_id = %request.id,
            agent_id = %agent.id(),
            reason = %reason,
            "Routing request"
        );

        let start = tokio::time::Instant::now();
        match invoke_with_timeout(&agent, request, context, self.config.request_timeout()).await {
            Ok(response) => {
                self.metrics.record_route_success(agent.id(), start.elapsed());
                Ok(response)
            }
            Err(error) => {
                self.metrics.record_route_failure(agent.id());
                warn!(
                    request_id = %request.id,
                    agent_id = %agent.id(),
                    error = %error,
                    "Selected agent failed"
                );
                self.recover(request, context, error).await
            }
        }
    }

    /// Engage fallback after a primary failure, or re-raise the error
    async fn recover(
        &self,
        request: &AgentRequest,
        context: Option<&RequestContext>,
        error: RouterError,
    ) -> RouterResult<AgentResponse> {
        if !self.config.enable_fallback {
            return Err(error);
        }
        let Some(default_id) = self.config.default_agent_id.as_deref() else {
            return Err(error);
        };
        let Some(fallback_agent) = self.registry.get(default_id) else {
            debug!(agent_id = %default_id, "Configured default agent not registered");
            return Err(error);
        };

        self.fallback
            .execute(request, &error, &[fallback_agent], context)
            .await
    }

    /// Apply the rule, capability, and default passes in order
    async fn select_agent(
        &self,
        request: &AgentRequest,
        context: Option<&RequestContext>,
    ) -> Option<(Arc<dyn Agent>, SelectionReason)> {
        // Rule pass. Conditions may be async, so snapshot under the lock and
        // evaluate after releasing it.
        let rules = self.rules.read().unwrap().snapshot();
        for rule in rules {
            if !rule.condition.matches(request, context).await {
                continue;
            }
            let Some(agent) = self.registry.get(&rule.target_agent_id) else {
                debug!(
                    target = %rule.target_agent_id,
                    "Rule target not registered, continuing"
                );
                continue;
            };
            if !agent.is_available().await {
                debug!(
                    target = %rule.target_agent_id,
                    "Rule target unavailable, continuing"
                );
                continue;
            }
            return Some((
                agent,
                SelectionReason::Rule {
                    priority: rule.priority,
                },
            ));
        }

        // Capability pass
        if let Some(capability) = request.capability() {
            let min_weight = request.min_capability_weight();
            if let Some(matched) = self
                .matcher
                .best_match(&self.registry, capability, min_weight)
                .await
            {
                return Some((
                    matched.agent,
                    SelectionReason::Capability {
                        score: matched.score,
                    },
                ));
            }
        }

        // Default pass
        if let Some(default_id) = self.config.default_agent_id.as_deref() {
            if let Some(agent) = self.registry.get(default_id) {
                if agent.is_available().await {
                    return Some((agent, SelectionReason::Default));
                }
            }
        }

        None
    }

    /// Enqueue a request for serialized processing
    ///
    /// A single worker drains the queue, calling `route` one request at a
    /// time - strict ordering at the cost of throughput. Direct `route` calls
    /// and queued requests may be mixed on the same router.
    pub async fn queue_request(
        self: &Arc<Self>,
        request: AgentRequest,
        context: Option<RequestContext>,
    ) -> RouterResult<AgentResponse> {
        let tx = self.queue_sender();
        let (reply_tx, reply_rx) = oneshot::channel();

        self.metrics.record_queued();
        tx.send(QueuedRequest {
            request,
            context,
            reply: reply_tx,
        })
        .map_err(|_| RouterError::QueueClosed)?;

        reply_rx.await.map_err(|_| RouterError::QueueClosed)?
    }

    /// Lazily spawn the queue worker and hand back its sender
    fn queue_sender(self: &Arc<Self>) -> mpsc::UnboundedSender<QueuedRequest> {
        let mut guard = self.queue_tx.lock().unwrap();
        if let Some(tx) = guard.as_ref() {
            if !tx.is_closed() {
                return tx.clone();
            }
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<QueuedRequest>();
        // The worker holds a Weak so the router (which stores the matching
        // sender) can still be dropped; dropping it closes the channel and
        // ends the loop
        let router = Arc::downgrade(self);
        tokio::spawn(async move {
            debug!("Serialized queue worker started");
            while let Some(item) = rx.recv().await {
                let Some(router) = router.upgrade() else {
                    break;
                };
                router.metrics.record_dequeued();
                let result = router.route(&item.request, item.context.as_ref()).await;
                // Caller may have dropped its receiver; nothing to do
                let _ = item.reply.send(result);
            }
            debug!("Serialized queue worker stopped");
        });

        *guard = Some(tx.clone());
        tx
    }
}
