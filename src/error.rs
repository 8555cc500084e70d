//! Error types for agent routing and fallback operations
//!
//! Every failure path in the router surfaces as a typed [`RouterError`] so
//! callers can distinguish a missing route from a timeout, an open circuit,
//! or an exhausted fallback chain.

use thiserror::Error;
use uuid::Uuid;

/// Main error type for routing operations
#[derive(Debug, Error)]
pub enum RouterError {
    /// No routing rule, capability match, or default agent produced a candidate
    #[error("No suitable agent found for request {request_id}")]
    NoSuitableAgent { request_id: Uuid },

    /// The agent's invocation exceeded its allotted time
    #[error("Agent '{agent_id}' timed out after {timeout_ms}ms")]
    Timeout { agent_id: String, timeout_ms: u64 },

    /// An agent raised an error while handling a request (propagated as-is)
    #[error("Agent '{agent_id}' failed: {message}")]
    AgentFailed { agent_id: String, message: String },

    /// The fallback circuit breaker is open; no fallback agent was tried
    #[error("Circuit breaker is open, retry in {retry_after_ms}ms")]
    CircuitOpen { retry_after_ms: u64 },

    /// Every fallback agent was tried and failed
    #[error("All fallback agents exhausted ({attempted} tried): {message}")]
    FallbackExhausted { attempted: usize, message: String },

    /// The serialized request queue worker has shut down
    #[error("Request queue is closed")]
    QueueClosed,

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl RouterError {
    /// Create a no-suitable-agent error for a request
    pub fn no_suitable_agent(request_id: Uuid) -> Self {
        Self::NoSuitableAgent { request_id }
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(agent_id: S, timeout_ms: u64) -> Self {
        Self::Timeout {
            agent_id: agent_id.into(),
            timeout_ms,
        }
    }

    /// Create an agent failure error
    pub fn agent_failed<S: Into<String>, M: Into<String>>(agent_id: S, message: M) -> Self {
        Self::AgentFailed {
            agent_id: agent_id.into(),
            message: message.into(),
        }
    }

    /// Create a circuit-open error
    pub fn circuit_open(retry_after_ms: u64) -> Self {
        Self::CircuitOpen { retry_after_ms }
    }

    /// Create a fallback exhaustion error
    pub fn fallback_exhausted<M: Into<String>>(attempted: usize, message: M) -> Self {
        Self::FallbackExhausted {
            attempted,
            message: message.into(),
        }
    }

    /// Whether this error is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Whether this error is a circuit-breaker fail-fast
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }
}

/// Result type for routing operations
pub type RouterResult<T> = Result<T, RouterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_suitable_agent_display() {
        let id = Uuid::new_v4();
        let error = RouterError::no_suitable_agent(id);
        assert!(error.to_string().contains(&id.to_string()));
        assert!(!error.is_timeout());
    }

    #[test]
    fn test_timeout_constructor() {
        let error = RouterError::timeout("slow-agent", 30000);
        assert!(error.is_timeout());
        assert_eq!(
            error.to_string(),
            "Agent 'slow-agent' timed out after 30000ms"
        );
    }

    #[test]
    fn test_agent_failed_constructor() {
        let error = RouterError::agent_failed("parser", "bad payload");
        assert!(matches!(error, RouterError::AgentFailed { .. }));
        assert_eq!(error.to_string(), "Agent 'parser' failed: bad payload");
    }

    #[test]
    fn test_circuit_open_predicate() {
        let error = RouterError::circuit_open(1500);
        assert!(error.is_circuit_open());
        assert!(error.to_string().contains("1500ms"));
    }

    #[test]
    fn test_fallback_exhausted_display() {
        let error = RouterError::fallback_exhausted(2, "last: connection refused");
        assert!(error.to_string().contains("2 tried"));
        assert!(error.to_string().contains("connection refused"));
    }
}
