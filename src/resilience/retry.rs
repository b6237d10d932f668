//! Bounded exponential-backoff retry.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::is_transient_message;

/// Decides whether a failed attempt should be retried.
pub type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Retry schedule and classification.
#[derive(Clone)]
pub struct RetryOptions<E> {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Upper bound for any single delay (before jitter).
    pub max_delay: Duration,
    /// Multiplier applied per attempt.
    pub backoff_factor: f64,
    retryable: RetryPredicate<E>,
}

impl<E: fmt::Display + 'static> Default for RetryOptions<E> {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000), Duration::from_millis(30_000))
    }
}

impl<E> fmt::Debug for RetryOptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOptions")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("backoff_factor", &self.backoff_factor)
            .finish_non_exhaustive()
    }
}

impl<E> RetryOptions<E> {
    /// Options with factor 2 and the transient-message predicate.
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self
    where
        E: fmt::Display + 'static,
    {
        Self {
            max_attempts,
            base_delay,
            max_delay,
            backoff_factor: 2.0,
            retryable: Arc::new(|err: &E| is_transient_message(&err.to_string())),
        }
    }

    /// Set the backoff multiplier.
    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Replace the retry predicate.
    pub fn with_retryable<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.retryable = Arc::new(predicate);
        self
    }

    /// Whether `err` should be retried.
    pub fn is_retryable(&self, err: &E) -> bool {
        (self.retryable)(err)
    }

    /// Backoff before attempt `attempt + 1`, without jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let millis = self.base_delay.as_millis() as f64 * self.backoff_factor.powi(exponent);
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped.max(0.0) as u64)
    }

    fn delay_with_jitter(&self, attempt: u32) -> Duration {
        let delay = self.delay_for(attempt);
        let jitter = delay.as_millis() as f64 * 0.1 * rand::random::<f64>();
        delay + Duration::from_millis(jitter as u64)
    }
}

/// What [`retry`] ended with.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    /// Final success value or the last error seen.
    pub result: Result<T, E>,
    /// Attempts actually made.
    pub attempts: u32,
}

impl<T, E> RetryOutcome<T, E> {
    /// True when an attempt succeeded.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Drop the attempt count.
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the attempt budget is spent. Never panics on operation failure.
pub async fn retry<T, E, F, Fut>(mut operation: F, options: &RetryOptions<E>) -> RetryOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let max_attempts = options.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, "Operation succeeded after retry");
                }
                return RetryOutcome {
                    result: Ok(value),
                    attempts: attempt,
                };
            }
            Err(err) => {
                if attempt >= max_attempts || !options.is_retryable(&err) {
                    debug!(attempt, error = %err, "Giving up");
                    return RetryOutcome {
                        result: Err(err),
                        attempts: attempt,
                    };
                }

                let delay = options.delay_with_jitter(attempt);
                warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
