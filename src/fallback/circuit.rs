//! Circuit breaker state machine
//!
//! Tracks cumulative fallback failures and gates fallback attempts through
//! CLOSED/OPEN/HALF_OPEN states. The breaker guards the fallback path as a
//! whole, not individual agents.

use crate::error::{RouterError, RouterResult};
use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Normal operation; failures accumulate toward the threshold
    Closed,
    /// Fail-fast; calls are rejected until the reset timeout elapses
    Open,
    /// One trial call is allowed through to probe recovery
    HalfOpen,
}

#[derive(Debug)]
struct CircuitInner {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
    opened_at: Option<Instant>,
    /// Whether the single HALF_OPEN trial slot is taken
    trial_in_flight: bool,
}

/// Failure-gating state machine for the fallback path
///
/// All transitions happen under one mutex so concurrent callers observe a
/// consistent state; in particular, only one caller can claim the HALF_OPEN
/// trial slot.
#[derive(Debug)]
pub struct CircuitBreaker {
    enabled: bool,
    threshold: u32,
    reset_timeout: Duration,
    inner: Mutex<CircuitInner>,
}

impl CircuitBreaker {
    pub fn new(enabled: bool, threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            enabled,
            threshold,
            reset_timeout,
            inner: Mutex::new(CircuitInner {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure: None,
                opened_at: None,
                trial_in_flight: false,
            }),
        }
    }

    /// Check whether a call may proceed
    ///
    /// An OPEN breaker whose reset timeout has elapsed transitions to
    /// HALF_OPEN here and admits the caller as the single trial. A disabled
    /// breaker always admits.
    pub fn check(&self) -> RouterResult<()> {
        if !self.enabled {
            return Ok(());
        }

        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| at.elapsed())
                    .unwrap_or(Duration::ZERO);
                if elapsed >= self.reset_timeout {
                    info!("Circuit breaker transitioning OPEN -> HALF_OPEN, admitting trial call");
                    inner.state = CircuitState::HalfOpen;
                    inner.trial_in_flight = true;
                    Ok(())
                } else {
                    let retry_after = self.reset_timeout - elapsed;
                    debug!(retry_after_ms = retry_after.as_millis() as u64, "Circuit open, failing fast");
                    Err(RouterError::circuit_open(retry_after.as_millis() as u64))
                }
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    // Trial slot taken; reject like OPEN
                    Err(RouterError::circuit_open(self.reset_timeout.as_millis() as u64))
                } else {
                    inner.trial_in_flight = true;
                    Ok(())
                }
            }
        }
    }

    /// Record a successful fallback call
    ///
    /// Any success closes the circuit and zeroes the failure count.
    pub fn record_success(&self) {
        if !self.enabled {
            return;
        }

        let mut inner = self.inner.lock().unwrap();
        if inner.state != CircuitState::Closed {
            info!(from = ?inner.state, "Circuit breaker closing after successful call");
        }
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.last_failure = None;
        inner.opened_at = None;
        inner.trial_in_flight = false;
    }

    /// Record a failed fallback call
    ///
    /// A HALF_OPEN failure reopens the circuit immediately; a CLOSED failure
    /// trips it once the threshold is reached. The failure count only resets
    /// on a transition to CLOSED, never by the passage of time.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.failure_count += 1;
        inner.last_failure = Some(Instant::now());

        if !self.enabled {
            return;
        }

        match inner.state {
            CircuitState::HalfOpen => {
                warn!("Circuit breaker trial failed, reopening");
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.trial_in_flight = false;
            }
            CircuitState::Closed if inner.failure_count >= self.threshold => {
                warn!(
                    failure_count = inner.failure_count,
                    threshold = self.threshold,
                    "Circuit breaker opening"
                );
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
            }
            _ => {}
        }
    }

    /// Current breaker state
    pub fn state(&self) -> CircuitState {
        self.inner.lock().unwrap().state
    }

    /// Cumulative failure count since the last transition to CLOSED
    pub fn failure_count(&self) -> u32 {
        self.inner.lock().unwrap().failure_count
    }
}
