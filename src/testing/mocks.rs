//! Mock agent implementations for testing
//!
//! Provides a scriptable [`MockAgent`] with configurable capabilities,
//! availability, load, delays, and failure schedules, plus atomic call
//! counting for asserting invocation bounds.

use crate::agent::{Agent, Capability};
use crate::error::{RouterError, RouterResult};
use crate::protocol::{AgentRequest, AgentResponse, RequestContext};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Scriptable agent for tests
///
/// Succeeds by default with `{"handled_by": <id>}`; builder methods script
/// failures, delays, capabilities, load, and availability.
pub struct MockAgent {
    id: String,
    name: String,
    capabilities: HashMap<String, Capability>,
    available: AtomicBool,
    load: Option<f64>,
    timeout: Option<Duration>,
    delay: Option<Duration>,
    never_resolves: bool,
    /// Remaining calls that should fail before succeeding
    failures_remaining: AtomicU64,
    calls: AtomicU64,
}

impl MockAgent {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: format!("mock-{id}"),
            capabilities: HashMap::new(),
            available: AtomicBool::new(true),
            load: None,
            timeout: None,
            delay: None,
            never_resolves: false,
            failures_remaining: AtomicU64::new(0),
            calls: AtomicU64::new(0),
        }
    }

    /// Claim a capability with a weight
    pub fn with_capability(mut self, name: &str, weight: f64) -> Self {
        self.capabilities
            .insert(name.to_string(), Capability::weighted(weight));
        self
    }

    /// Claim a capability with a weight and priority
    pub fn with_capability_priority(mut self, name: &str, weight: f64, priority: u32) -> Self {
        self.capabilities.insert(
            name.to_string(),
            Capability::weighted(weight).with_priority(priority),
        );
        self
    }

    /// Report this load from `current_load`
    pub fn with_load(mut self, load: f64) -> Self {
        self.load = Some(load);
        self
    }

    /// Override the global request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sleep this long inside `handle` before responding
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// `handle` never resolves (for timeout tests)
    pub fn never_resolving(mut self) -> Self {
        self.never_resolves = true;
        self
    }

    /// Every call fails
    pub fn always_failing(mut self) -> Self {
        self.failures_remaining = AtomicU64::new(u64::MAX);
        self
    }

    /// The first `n` calls fail, subsequent calls succeed
    pub fn failing_first(mut self, n: u64) -> Self {
        self.failures_remaining = AtomicU64::new(n);
        self
    }

    /// Report unavailable from `is_available`
    pub fn unavailable(self) -> Self {
        self.available.store(false, Ordering::SeqCst);
        self
    }

    /// Flip availability at runtime
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// How many times `handle` was invoked
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Agent for MockAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &HashMap<String, Capability> {
        &self.capabilities
    }

    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn current_load(&self) -> Option<f64> {
        self.load
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn handle(
        &self,
        request: &AgentRequest,
        _context: Option<&RequestContext>,
    ) -> RouterResult<AgentResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.never_resolves {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let should_fail = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                if remaining == 0 || remaining == u64::MAX {
                    None
                } else {
                    Some(remaining - 1)
                }
            })
            .map(|previous| previous > 0)
            .unwrap_or_else(|previous| previous == u64::MAX);

        if should_fail {
            return Err(RouterError::agent_failed(&self.id, "scripted failure"));
        }

        Ok(AgentResponse::ok(json!({
            "handled_by": self.id,
            "request_id": request.id.to_string(),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_succeeds_by_default() {
        let agent = MockAgent::new("ok");
        let request = AgentRequest::new("task", json!({}));

        let response = agent.handle(&request, None).await.unwrap();
        assert!(response.success);
        assert_eq!(agent.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_first_recovers() {
        let agent = MockAgent::new("flaky").failing_first(2);
        let request = AgentRequest::new("task", json!({}));

        assert!(agent.handle(&request, None).await.is_err());
        assert!(agent.handle(&request, None).await.is_err());
        assert!(agent.handle(&request, None).await.is_ok());
        assert_eq!(agent.call_count(), 3);
    }

    #[tokio::test]
    async fn test_always_failing_never_recovers() {
        let agent = MockAgent::new("broken").always_failing();
        let request = AgentRequest::new("task", json!({}));

        for _ in 0..5 {
            assert!(agent.handle(&request, None).await.is_err());
        }
    }

    #[tokio::test]
    async fn test_availability_toggle() {
        let agent = MockAgent::new("toggled");
        assert!(agent.is_available().await);

        agent.set_available(false);
        assert!(!agent.is_available().await);
    }
}
