//! Retry policy implementation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryStrategy {
    /// Same delay before every attempt.
    Fixed,
    /// `attempt * base_delay`.
    #[default]
    Linear,
    /// `base_delay * multiplier^(attempt - 1)`.
    Exponential,
}

/// Retry policy configuration.
///
/// Every computed delay is capped at `max_delay`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Backoff strategy.
    pub strategy: RetryStrategy,
    /// Maximum number of attempts; `0` retries forever.
    pub max_attempts: u32,
    /// Base delay between attempts.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::linear(Duration::from_millis(50), Duration::from_secs(2))
    }
}

impl RetryPolicy {
    /// Creates an unbounded linear policy: `min(attempt * base, cap)`.
    #[must_use]
    pub fn linear(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            strategy: RetryStrategy::Linear,
            max_attempts: 0,
            base_delay,
            max_delay,
            multiplier: 1.0,
        }
    }

    /// Creates an unbounded exponential policy doubling from `base_delay`.
    #[must_use]
    pub fn exponential(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            strategy: RetryStrategy::Exponential,
            max_attempts: 0,
            base_delay,
            max_delay,
            multiplier: 2.0,
        }
    }

    /// Creates an unbounded fixed-delay policy.
    #[must_use]
    pub fn fixed(delay: Duration) -> Self {
        Self {
            strategy: RetryStrategy::Fixed,
            max_attempts: 0,
            base_delay: delay,
            max_delay: delay,
            multiplier: 1.0,
        }
    }

    /// Bounds the number of attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Returns true if the policy never gives up.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.max_attempts == 0
    }

    /// Returns true if another attempt is allowed after `attempts` have been made.
    #[must_use]
    pub const fn should_retry(&self, attempts: u32) -> bool {
        self.is_unbounded() || attempts < self.max_attempts
    }

    /// Calculates the delay before the given attempt (1-indexed).
    ///
    /// Attempt 0 never waits.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_ms = self.base_delay.as_millis() as f64;
        let raw_ms = match self.strategy {
            RetryStrategy::Fixed => base_ms,
            RetryStrategy::Linear => base_ms * f64::from(attempt),
            RetryStrategy::Exponential => {
                let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
                base_ms * self.multiplier.powi(exponent)
            }
        };

        let capped_ms = raw_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms as u64)
    }

    /// Waits out the delay before `attempt`.
    pub async fn backoff(&self, attempt: u32) {
        let delay = self.delay_for_attempt(attempt);
        debug!(attempt, delay_ms = delay.as_millis() as u64, "Backing off before retry");
        tokio::time::sleep(delay).await;
    }

    /// Runs `f` until it succeeds or the policy runs out of attempts.
    ///
    /// Returns the last error. An unbounded policy retries forever, so use a
    /// bounded one for operations that can fail permanently.
    pub async fn execute<F, Fut, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.execute_if(f, |_| true).await
    }

    /// Like [`execute`](Self::execute), but only retries errors accepted by
    /// `retry_if`. Any other error is returned after the attempt that produced it.
    pub async fn execute_if<F, Fut, T, E, P>(&self, mut f: F, retry_if: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
        P: Fn(&E) -> bool,
    {
        let mut attempts: u32 = 0;

        loop {
            match f().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    attempts = attempts.saturating_add(1);
                    if !retry_if(&e) {
                        debug!(attempts, error = %e, "Attempt failed with a permanent error");
                        return Err(e);
                    }
                    if !self.should_retry(attempts) {
                        return Err(e);
                    }
                    debug!(attempts, error = %e, "Attempt failed");
                    self.backoff(attempts).await;
                }
            }
        }
    }
}
