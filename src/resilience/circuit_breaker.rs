//! Failure-counting circuit breaker.
//!
//! States move `Closed -> Open -> HalfOpen -> Closed`. While open, calls are
//! rejected with [`CrewError::CircuitOpen`] until the recovery timeout has
//! elapsed since the last failure; then a single probe is let through.

use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{CrewError, CrewResult};

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls pass through.
    Closed,
    /// Calls are rejected.
    Open,
    /// One probe call is allowed.
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Thresholds for a [`CircuitBreaker`].
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// Time since the last failure before a probe is allowed.
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(30),
        }
    }
}

impl CircuitBreakerConfig {
    /// Set the failure threshold.
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    /// Set the recovery timeout.
    pub fn with_recovery_timeout(mut self, timeout: Duration) -> Self {
        self.recovery_timeout = timeout;
        self
    }
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failures: u32,
    last_failure: Option<Instant>,
    probe_started: Option<Instant>,
}

impl Default for BreakerState {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            failures: 0,
            last_failure: None,
            probe_started: None,
        }
    }
}

/// Circuit breaker guarding one remote dependency.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerState::default()),
        }
    }

    /// Create a breaker with threshold 3 and a 30 second recovery timeout.
    pub fn with_defaults(name: impl Into<String>) -> Self {
        Self::new(name, CircuitBreakerConfig::default())
    }

    /// Breaker name used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Consecutive failures recorded.
    pub fn failures(&self) -> u32 {
        self.lock().failures
    }

    /// Force the breaker back to closed.
    pub fn reset(&self) {
        *self.lock() = BreakerState::default();
        debug!(name = %self.name, "Circuit breaker reset");
    }

    /// Ask permission for one call.
    pub fn try_acquire(&self) -> CrewResult<()> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let cooled_down = inner
                    .last_failure
                    .map(|at| at.elapsed() >= self.config.recovery_timeout)
                    .unwrap_or(true);
                if cooled_down {
                    inner.state = CircuitState::HalfOpen;
                    inner.probe_started = Some(Instant::now());
                    info!(name = %self.name, "Circuit breaker half-open, probing");
                    Ok(())
                } else {
                    Err(CrewError::CircuitOpen)
                }
            }
            CircuitState::HalfOpen => {
                // A probe whose caller vanished must not wedge the breaker.
                let stale = inner
                    .probe_started
                    .map(|at| at.elapsed() >= self.config.recovery_timeout)
                    .unwrap_or(true);
                if stale {
                    inner.probe_started = Some(Instant::now());
                    Ok(())
                } else {
                    Err(CrewError::CircuitOpen)
                }
            }
        }
    }

    /// Record a successful call.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        if inner.state != CircuitState::Closed {
            info!(name = %self.name, "Circuit breaker closed");
        }
        inner.state = CircuitState::Closed;
        inner.failures = 0;
        inner.probe_started = None;
    }

    /// Record a failed call.
    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.failures += 1;
        inner.last_failure = Some(Instant::now());
        inner.probe_started = None;

        let should_open = inner.state == CircuitState::HalfOpen
            || inner.failures >= self.config.failure_threshold;
        if should_open && inner.state != CircuitState::Open {
            warn!(
                name = %self.name,
                failures = inner.failures,
                threshold = self.config.failure_threshold,
                "Circuit breaker opened"
            );
        }
        if should_open {
            inner.state = CircuitState::Open;
        }
    }

    /// Run `operation` through the breaker.
    pub async fn execute<T, F, Fut>(&self, operation: F) -> CrewResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CrewResult<T>>,
    {
        self.try_acquire()?;
        match operation().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(err) => {
                self.record_failure();
                Err(err)
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
