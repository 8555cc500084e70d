//! Fallback chain execution
//!
//! Given a primary failure, walks an ordered list of fallback agents,
//! retrying each with bounded attempts and a fixed delay, consulting the
//! shared circuit breaker before every agent.

use crate::agent::{invoke_with_timeout, Agent};
use crate::config::RouterConfig;
use crate::error::{RouterError, RouterResult};
use crate::fallback::circuit::{CircuitBreaker, CircuitState};
use crate::observability::metrics::MetricsStore;
use crate::protocol::{AgentRequest, AgentResponse, RequestContext};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn, Instrument};

/// Walks the fallback chain after a primary failure
pub struct FallbackCoordinator {
    breaker: CircuitBreaker,
    max_retries: u32,
    retry_delay: Duration,
    request_timeout: Duration,
    metrics: Arc<MetricsStore>,
}

impl FallbackCoordinator {
    pub fn new(config: &RouterConfig, metrics: Arc<MetricsStore>) -> Self {
        Self {
            breaker: CircuitBreaker::new(
                config.enable_circuit_breaker,
                config.circuit_breaker_threshold,
                config.circuit_breaker_reset_timeout(),
            ),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
            request_timeout: config.request_timeout(),
            metrics,
        }
    }

    /// Current state of the shared circuit breaker
    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// The shared circuit breaker guarding the fallback path
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Try each fallback agent in order until one succeeds
    ///
    /// Unavailable agents are skipped without consulting the breaker; the
    /// breaker is checked before every actual attempt, and an open circuit
    /// aborts the entire call without touching any remaining agent. The
    /// first successful attempt wins and later agents are never tried.
    /// Exhausting the list yields [`RouterError::FallbackExhausted`].
    pub async fn execute(
        &self,
        request: &AgentRequest,
        trigger: &RouterError,
        fallback_agents: &[Arc<dyn Agent>],
        context: Option<&RequestContext>,
    ) -> RouterResult<AgentResponse> {
        let span = crate::fallback_span!(
            request_id = %request.id,
            chain_len = fallback_agents.len(),
        );
        self.execute_inner(request, trigger, fallback_agents, context)
            .instrument(span)
            .await
    }

    async fn execute_inner(
        &self,
        request: &AgentRequest,
        trigger: &RouterError,
        fallback_agents: &[Arc<dyn Agent>],
        context: Option<&RequestContext>,
    ) -> RouterResult<AgentResponse> {
        info!(
            request_id = %request.id,
            trigger = %trigger,
            "Engaging fallback chain"
        );

        let mut attempted = 0usize;
        let mut last_error: Option<RouterError> = None;

        for agent in fallback_agents {
            if !agent.is_available().await {
                debug!(agent_id = %agent.id(), "Skipping unavailable fallback agent");
                continue;
            }

            // The half-open trial slot is claimed here, and only when an
            // attempt follows, so a walk that skips every agent leaves the
            // breaker untouched
            self.breaker.check()?;

            attempted += 1;
            match self.try_with_retries(request, agent, context).await {
                Ok(response) => {
                    self.breaker.record_success();
                    info!(
                        request_id = %request.id,
                        agent_id = %agent.id(),
                        "Fallback agent recovered the request"
                    );
                    return Ok(response);
                }
                Err(error) => {
                    self.breaker.record_failure();
                    warn!(
                        agent_id = %agent.id(),
                        error = %error,
                        "Fallback agent exhausted its retries"
                    );
                    last_error = Some(error);
                }
            }
        }

        let message = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| format!("triggered by: {trigger}"));
        Err(RouterError::fallback_exhausted(attempted, message))
    }

    /// Invoke one agent up to `max_retries` times with a fixed delay between
    /// attempts (none before the first)
    async fn try_with_retries(
        &self,
        request: &AgentRequest,
        agent: &Arc<dyn Agent>,
        context: Option<&RequestContext>,
    ) -> RouterResult<AgentResponse> {
        let mut last_error: Option<RouterError> = None;

        for attempt in 1..=self.max_retries {
            if attempt > 1 {
                tokio::time::sleep(self.retry_delay).await;
            }

            debug!(
                agent_id = %agent.id(),
                attempt = attempt,
                max_attempts = self.max_retries,
                "Fallback attempt"
            );

            let start = tokio::time::Instant::now();
            match invoke_with_timeout(agent, request, context, self.request_timeout).await {
                Ok(response) => {
                    self.metrics.record_agent_success(agent.id(), start.elapsed());
                    return Ok(response);
                }
                Err(error) => {
                    self.metrics.record_agent_error(agent.id());
                    warn!(
                        agent_id = %agent.id(),
                        attempt = attempt,
                        error = %error,
                        "Fallback attempt failed"
                    );
                    last_error = Some(error);
                }
            }
        }

        // max_retries >= 1 is enforced by config validation
        Err(last_error.unwrap_or_else(|| {
            RouterError::agent_failed(agent.id(), "no attempts were made")
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mocks::MockAgent;
    use serde_json::json;

    fn coordinator(config: &RouterConfig) -> FallbackCoordinator {
        FallbackCoordinator::new(config, Arc::new(MetricsStore::new()))
    }

    fn fast_config() -> RouterConfig {
        RouterConfig {
            max_retries: 3,
            retry_delay_ms: 1000,
            circuit_breaker_threshold: 3,
            ..RouterConfig::default()
        }
    }

    fn request() -> AgentRequest {
        AgentRequest::new("task", json!({}))
    }

    fn trigger() -> RouterError {
        RouterError::agent_failed("primary", "boom")
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_success_stops_chain() {
        let config = fast_config();
        let coordinator = coordinator(&config);
        let first = Arc::new(MockAgent::new("first"));
        let second = Arc::new(MockAgent::new("second"));
        let chain: Vec<Arc<dyn Agent>> = vec![first.clone(), second.clone()];

        let response = coordinator
            .execute(&request(), &trigger(), &chain, None)
            .await
            .unwrap();

        assert!(response.success);
        assert_eq!(first.call_count(), 1);
        assert_eq!(second.call_count(), 0);
        assert_eq!(coordinator.circuit_state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_bound_and_fixed_delay() {
        let config = fast_config();
        let coordinator = coordinator(&config);
        let failing = Arc::new(MockAgent::new("failing").always_failing());
        let chain: Vec<Arc<dyn Agent>> = vec![failing.clone()];

        let start = tokio::time::Instant::now();
        let error = coordinator
            .execute(&request(), &trigger(), &chain, None)
            .await
            .unwrap_err();

        assert!(matches!(error, RouterError::FallbackExhausted { attempted: 1, .. }));
        assert_eq!(failing.call_count(), 3);
        // Two fixed 1000ms gaps: between attempts 1->2 and 2->3
        assert_eq!(start.elapsed(), Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_agents_skipped() {
        let config = fast_config();
        let coordinator = coordinator(&config);
        let offline = Arc::new(MockAgent::new("offline").unavailable());
        let online = Arc::new(MockAgent::new("online"));
        let chain: Vec<Arc<dyn Agent>> = vec![offline.clone(), online.clone()];

        let response = coordinator
            .execute(&request(), &trigger(), &chain, None)
            .await
            .unwrap();

        assert!(response.success);
        assert_eq!(offline.call_count(), 0);
        assert_eq!(online.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_agent_recovers_after_earlier_exhausts() {
        let config = fast_config();
        let coordinator = coordinator(&config);
        let failing = Arc::new(MockAgent::new("failing").always_failing());
        let backup = Arc::new(MockAgent::new("backup"));
        let chain: Vec<Arc<dyn Agent>> = vec![failing.clone(), backup.clone()];

        let response = coordinator
            .execute(&request(), &trigger(), &chain, None)
            .await
            .unwrap();

        assert!(response.success);
        assert_eq!(failing.call_count(), 3);
        assert_eq!(backup.call_count(), 1);
        // Backup success closed the breaker and zeroed the count
        assert_eq!(coordinator.breaker().failure_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_circuit_aborts_without_touching_agents() {
        let config = fast_config();
        let coordinator = coordinator(&config);
        for _ in 0..3 {
            coordinator.breaker().record_failure();
        }
        assert_eq!(coordinator.circuit_state(), CircuitState::Open);

        let untouched = Arc::new(MockAgent::new("untouched"));
        let chain: Vec<Arc<dyn Agent>> = vec![untouched.clone()];

        let error = coordinator
            .execute(&request(), &trigger(), &chain, None)
            .await
            .unwrap_err();

        assert!(error.is_circuit_open());
        assert_eq!(untouched.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_agents_leave_half_open_trial_unclaimed() {
        let config = fast_config();
        let coordinator = coordinator(&config);
        for _ in 0..3 {
            coordinator.breaker().record_failure();
        }
        assert_eq!(coordinator.circuit_state(), CircuitState::Open);
        tokio::time::advance(Duration::from_secs(30)).await;

        // Reset timeout has elapsed, but the only agent is down: the walk
        // must not claim the trial slot it will never resolve
        let agent = Arc::new(MockAgent::new("recovering").unavailable());
        let chain: Vec<Arc<dyn Agent>> = vec![agent.clone()];

        let error = coordinator
            .execute(&request(), &trigger(), &chain, None)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            RouterError::FallbackExhausted { attempted: 0, .. }
        ));
        assert_eq!(agent.call_count(), 0);

        // Once the agent is back, the trial call is admitted and closes
        // the circuit
        agent.set_available(true);
        let response = coordinator
            .execute(&request(), &trigger(), &chain, None)
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(agent.call_count(), 1);
        assert_eq!(coordinator.circuit_state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_trips_breaker_mid_walk() {
        // Threshold 3: two agents failing in this walk plus one prior failure
        // trips the breaker before the third agent is consulted
        let config = fast_config();
        let coordinator = coordinator(&config);
        coordinator.breaker().record_failure();

        let a = Arc::new(MockAgent::new("a").always_failing());
        let b = Arc::new(MockAgent::new("b").always_failing());
        let c = Arc::new(MockAgent::new("c"));
        let chain: Vec<Arc<dyn Agent>> = vec![a.clone(), b.clone(), c.clone()];

        let error = coordinator
            .execute(&request(), &trigger(), &chain, None)
            .await
            .unwrap_err();

        assert!(error.is_circuit_open());
        assert_eq!(c.call_count(), 0);
    }
}
