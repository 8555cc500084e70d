//! Rule-based routing overrides
//!
//! Rules are explicit condition-to-target mappings evaluated before any
//! capability scoring. Evaluation order is always descending priority;
//! equal priorities keep insertion order (stable sort).

use crate::protocol::{AgentRequest, RequestContext};
use async_trait::async_trait;
use std::sync::Arc;

/// Condition predicate for a routing rule
///
/// Implemented automatically for plain closures; implement the trait directly
/// when the condition needs async work (e.g. consulting an external flag).
#[async_trait]
pub trait RuleCondition: Send + Sync {
    async fn matches(&self, request: &AgentRequest, context: Option<&RequestContext>) -> bool;
}

#[async_trait]
impl<F> RuleCondition for F
where
    F: Fn(&AgentRequest, Option<&RequestContext>) -> bool + Send + Sync,
{
    async fn matches(&self, request: &AgentRequest, context: Option<&RequestContext>) -> bool {
        self(request, context)
    }
}

/// An explicit condition-to-target routing override
#[derive(Clone)]
pub struct RoutingRule {
    /// Predicate deciding whether this rule applies to a request
    pub condition: Arc<dyn RuleCondition>,
    /// Agent id the request is routed to when the condition holds
    pub target_agent_id: String,
    /// Evaluation priority; higher runs first (default 0)
    pub priority: i32,
}

impl RoutingRule {
    /// Rule with default priority 0
    pub fn new<S: Into<String>>(target_agent_id: S, condition: impl RuleCondition + 'static) -> Self {
        Self {
            condition: Arc::new(condition),
            target_agent_id: target_agent_id.into(),
            priority: 0,
        }
    }

    /// Set the evaluation priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl std::fmt::Debug for RoutingRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingRule")
            .field("target_agent_id", &self.target_agent_id)
            .field("priority", &self.priority)
            .finish()
    }
}

/// Ordered set of routing rules
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<RoutingRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule, keeping the set sorted by descending priority
    ///
    /// `sort_by_key` is stable, so rules with equal priority keep their
    /// relative insertion order.
    pub fn add(&mut self, rule: RoutingRule) {
        self.rules.push(rule);
        self.rules.sort_by_key(|r| std::cmp::Reverse(r.priority));
    }

    /// Remove every rule matching the predicate; returns how many were removed
    pub fn remove_where(&mut self, predicate: impl Fn(&RoutingRule) -> bool) -> usize {
        let before = self.rules.len();
        self.rules.retain(|rule| !predicate(rule));
        before - self.rules.len()
    }

    /// Rules in evaluation order (descending priority, stable)
    pub fn iter(&self) -> impl Iterator<Item = &RoutingRule> {
        self.rules.iter()
    }

    /// Snapshot of the rules in evaluation order
    ///
    /// Conditions may be async, so callers snapshot under the lock and
    /// evaluate after releasing it.
    pub fn snapshot(&self) -> Vec<RoutingRule> {
        self.rules.clone()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn always(_request: &AgentRequest, _context: Option<&RequestContext>) -> bool {
        true
    }

    #[test]
    fn test_rules_sorted_by_descending_priority() {
        let mut rules = RuleSet::new();
        rules.add(RoutingRule::new("low", always).with_priority(1));
        rules.add(RoutingRule::new("high", always).with_priority(10));
        rules.add(RoutingRule::new("mid", always).with_priority(5));

        let targets: Vec<&str> = rules.iter().map(|r| r.target_agent_id.as_str()).collect();
        assert_eq!(targets, vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_equal_priority_keeps_insertion_order() {
        let mut rules = RuleSet::new();
        rules.add(RoutingRule::new("first", always).with_priority(3));
        rules.add(RoutingRule::new("second", always).with_priority(3));
        rules.add(RoutingRule::new("third", always).with_priority(3));

        let targets: Vec<&str> = rules.iter().map(|r| r.target_agent_id.as_str()).collect();
        assert_eq!(targets, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_remove_where() {
        let mut rules = RuleSet::new();
        rules.add(RoutingRule::new("keep", always));
        rules.add(RoutingRule::new("drop", always));
        rules.add(RoutingRule::new("drop", always).with_priority(4));

        let removed = rules.remove_where(|r| r.target_agent_id == "drop");
        assert_eq!(removed, 2);
        assert_eq!(rules.len(), 1);
    }

    #[tokio::test]
    async fn test_closure_condition_evaluates() {
        let rule = RoutingRule::new(
            "urgent-agent",
            |request: &AgentRequest, _context: Option<&RequestContext>| {
                request.payload.get("urgent").and_then(|v| v.as_bool()) == Some(true)
            },
        );

        let urgent = AgentRequest::new("task", json!({"urgent": true}));
        let routine = AgentRequest::new("task", json!({"urgent": false}));

        assert!(rule.condition.matches(&urgent, None).await);
        assert!(!rule.condition.matches(&routine, None).await);
    }
}
