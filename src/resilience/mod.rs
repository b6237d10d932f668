//! Resilience primitives for remote calls.
//!
//! [`retry`] recovers transient failures with exponential backoff and
//! jitter; [`CircuitBreaker`] stops calling a dependency that keeps failing.
//! The model gateway composes both: the breaker wraps every attempt made by
//! the retry loop.

pub mod circuit_breaker;
pub mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use retry::{retry, RetryOptions, RetryOutcome, RetryPredicate};
