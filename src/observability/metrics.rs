//! Thread-safe routing metrics
//!
//! Atomic counters for high-frequency request totals and mutex-protected
//! state for online latency means and per-agent statistics. The store is an
//! owned struct shared by reference between the router and the fallback
//! coordinator - there is no ambient singleton.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Running mean updated incrementally without storing full history
#[derive(Debug, Default, Clone)]
struct OnlineMean {
    count: u64,
    mean_ms: f64,
}

impl OnlineMean {
    fn observe(&mut self, elapsed_ms: f64) {
        self.count += 1;
        self.mean_ms += (elapsed_ms - self.mean_ms) / self.count as f64;
    }

    fn reset(&mut self) {
        self.count = 0;
        self.mean_ms = 0.0;
    }
}

/// Per-agent running statistics
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct AgentStats {
    /// Successful invocations attributed to this agent
    pub request_count: u64,
    /// Failed invocations attributed to this agent
    pub error_count: u64,
    /// Online mean of successful invocation latency, in milliseconds
    pub average_time_ms: f64,
    /// Timestamp of the last successful invocation
    pub last_used: Option<DateTime<Utc>>,
}

/// Snapshot of router-wide metrics
#[derive(Debug, Clone, Serialize)]
pub struct RouterMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Global online mean of successful route latency, in milliseconds
    pub average_response_time_ms: f64,
    /// Requests accepted through the serialized queue
    pub queued_requests: u64,
    /// Requests currently waiting in the serialized queue
    pub queue_depth: u64,
    /// Per-agent statistics keyed by agent id
    pub agent_stats: HashMap<String, AgentStats>,
}

/// Running counters and online averages per agent and globally
pub struct MetricsStore {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    queued_requests: AtomicU64,
    queue_depth: AtomicU64,
    global_mean: Mutex<OnlineMean>,
    agent_stats: Mutex<HashMap<String, AgentStats>>,
}

impl Default for MetricsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsStore {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            successful_requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            queued_requests: AtomicU64::new(0),
            queue_depth: AtomicU64::new(0),
            global_mean: Mutex::new(OnlineMean::default()),
            agent_stats: Mutex::new(HashMap::new()),
        }
    }

    /// Create a zeroed stats entry for a newly registered agent
    pub fn init_agent(&self, agent_id: &str) {
        let mut stats = self.agent_stats.lock().unwrap();
        stats.entry(agent_id.to_string()).or_default();
    }

    /// Drop the stats entry for an unregistered agent
    pub fn drop_agent(&self, agent_id: &str) {
        let mut stats = self.agent_stats.lock().unwrap();
        stats.remove(agent_id);
    }

    /// Record a successfully routed request
    pub fn record_route_success(&self, agent_id: &str, elapsed: Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.successful_requests.fetch_add(1, Ordering::Relaxed);

        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        self.global_mean.lock().unwrap().observe(elapsed_ms);
        self.record_agent_success_ms(agent_id, elapsed_ms);
    }

    /// Record a route whose selected agent failed or timed out
    pub fn record_route_failure(&self, agent_id: &str) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
        self.record_agent_error(agent_id);
    }

    /// Record a route for which no agent could be selected
    pub fn record_route_rejected(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Attribute a successful invocation to an agent (fallback path)
    pub fn record_agent_success(&self, agent_id: &str, elapsed: Duration) {
        self.record_agent_success_ms(agent_id, elapsed.as_secs_f64() * 1000.0);
    }

    fn record_agent_success_ms(&self, agent_id: &str, elapsed_ms: f64) {
        let mut stats = self.agent_stats.lock().unwrap();
        let entry = stats.entry(agent_id.to_string()).or_default();
        entry.request_count += 1;
        entry.last_used = Some(Utc::now());

        // Inline online mean over the agent's own success count
        let count = entry.request_count as f64;
        entry.average_time_ms += (elapsed_ms - entry.average_time_ms) / count;
    }

    /// Attribute a failed invocation to an agent
    pub fn record_agent_error(&self, agent_id: &str) {
        let mut stats = self.agent_stats.lock().unwrap();
        let entry = stats.entry(agent_id.to_string()).or_default();
        entry.error_count += 1;
    }

    /// Record acceptance into the serialized queue
    pub fn record_queued(&self) {
        self.queued_requests.fetch_add(1, Ordering::Relaxed);
        self.queue_depth.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a queued request being picked up by the worker
    pub fn record_dequeued(&self) {
        self.queue_depth.fetch_sub(1, Ordering::Relaxed);
    }

    /// Snapshot current metrics
    pub fn snapshot(&self) -> RouterMetrics {
        let global_mean = self.global_mean.lock().unwrap();
        let agent_stats = self.agent_stats.lock().unwrap();

        RouterMetrics {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            average_response_time_ms: global_mean.mean_ms,
            queued_requests: self.queued_requests.load(Ordering::Relaxed),
            queue_depth: self.queue_depth.load(Ordering::Relaxed),
            agent_stats: agent_stats.clone(),
        }
    }

    /// Zero all counters and means; agent keys are preserved
    pub fn reset(&self) {
        self.total_requests.store(0, Ordering::Relaxed);
        self.successful_requests.store(0, Ordering::Relaxed);
        self.failed_requests.store(0, Ordering::Relaxed);
        self.queued_requests.store(0, Ordering::Relaxed);
        self.global_mean.lock().unwrap().reset();

        let mut stats = self.agent_stats.lock().unwrap();
        for entry in stats.values_mut() {
            *entry = AgentStats::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_online_mean_matches_arithmetic_mean() {
        let mut mean = OnlineMean::default();
        for value in [10.0, 20.0, 30.0, 40.0] {
            mean.observe(value);
        }
        assert!((mean.mean_ms - 25.0).abs() < 1e-9);
        assert_eq!(mean.count, 4);
    }

    #[test]
    fn test_route_success_updates_global_and_agent() {
        let store = MetricsStore::new();
        store.init_agent("worker");

        store.record_route_success("worker", Duration::from_millis(100));
        store.record_route_success("worker", Duration::from_millis(300));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.total_requests, 2);
        assert_eq!(snapshot.successful_requests, 2);
        assert_eq!(snapshot.failed_requests, 0);
        assert!((snapshot.average_response_time_ms - 200.0).abs() < 1e-6);

        let stats = &snapshot.agent_stats["worker"];
        assert_eq!(stats.request_count, 2);
        assert_eq!(stats.error_count, 0);
        assert!((stats.average_time_ms - 200.0).abs() < 1e-6);
        assert!(stats.last_used.is_some());
    }

    #[test]
    fn test_route_failure_only_bumps_error_count() {
        let store = MetricsStore::new();
        store.init_agent("flaky");

        store.record_route_failure("flaky");

        let snapshot = store.snapshot();
        assert_eq!(snapshot.total_requests, 1);
        assert_eq!(snapshot.failed_requests, 1);

        let stats = &snapshot.agent_stats["flaky"];
        assert_eq!(stats.error_count, 1);
        assert_eq!(stats.request_count, 0);
        assert!(stats.last_used.is_none());
    }

    #[test]
    fn test_rejected_route_counts_globally_only() {
        let store = MetricsStore::new();
        store.record_route_rejected();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.total_requests, 1);
        assert_eq!(snapshot.failed_requests, 1);
        assert!(snapshot.agent_stats.is_empty());
    }

    #[test]
    fn test_reset_preserves_agent_keys() {
        let store = MetricsStore::new();
        store.init_agent("kept");
        store.record_route_success("kept", Duration::from_millis(50));

        store.reset();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.total_requests, 0);
        assert_eq!(snapshot.average_response_time_ms, 0.0);
        assert!(snapshot.agent_stats.contains_key("kept"));
        assert_eq!(snapshot.agent_stats["kept"], AgentStats::default());
    }

    #[test]
    fn test_drop_agent_removes_stats() {
        let store = MetricsStore::new();
        store.init_agent("gone");
        store.drop_agent("gone");

        assert!(store.snapshot().agent_stats.is_empty());
    }

    #[test]
    fn test_queue_counters() {
        let store = MetricsStore::new();
        store.record_queued();
        store.record_queued();
        store.record_dequeued();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.queued_requests, 2);
        assert_eq!(snapshot.queue_depth, 1);
    }
}
