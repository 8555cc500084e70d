//! Request and response envelopes for agent invocation
//!
//! These are the only message shapes that cross the router boundary. Both are
//! immutable once constructed; the router never mutates a caller's request.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Minimum capability weight applied when a request does not specify one
pub const DEFAULT_MIN_CAPABILITY_WEIGHT: f64 = 0.5;

/// Caller-supplied context passed through to the selected agent
pub type RequestContext = HashMap<String, Value>;

/// A request routed to an agent
///
/// The payload may carry a `capability` key (and an optional
/// `capability_weight` minimum) to opt into capability-weighted selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentRequest {
    /// UUID v4 request identifier
    pub id: Uuid,
    /// Request type label (caller-defined, e.g. "task", "query")
    pub request_type: String,
    /// Request payload - SHOULD be an object for structured data
    pub payload: Value,
    /// Optional embedded context object
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    /// Optional metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
}

impl AgentRequest {
    /// Create a request with a fresh id and no context or metadata
    pub fn new<S: Into<String>>(request_type: S, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_type: request_type.into(),
            payload,
            context: None,
            metadata: None,
        }
    }

    /// Requested capability name, if the payload carries one
    pub fn capability(&self) -> Option<&str> {
        self.payload.get("capability").and_then(Value::as_str)
    }

    /// Minimum capability weight for this request
    ///
    /// A missing or non-numeric `capability_weight` falls back to
    /// [`DEFAULT_MIN_CAPABILITY_WEIGHT`].
    pub fn min_capability_weight(&self) -> f64 {
        self.payload
            .get("capability_weight")
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_MIN_CAPABILITY_WEIGHT)
    }
}

/// Response returned by an agent's `handle`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentResponse {
    /// Whether the agent considers the request handled successfully
    pub success: bool,
    /// Response data (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Error description (present on agent-reported soft failures)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Optional metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
}

impl AgentResponse {
    /// Successful response carrying data
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            metadata: None,
        }
    }

    /// Agent-reported soft failure (returned, not raised)
    pub fn failure<S: Into<String>>(error: S) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            metadata: None,
        }
    }
}
