//! Exponential backoff between attempts of one logical request.

use std::time::Duration;

/// Configuration for the retry policy.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts per logical request (including the first).
    pub max_retries: u32,
    /// Delay after the first failed attempt.
    pub base_delay: Duration,
    /// Multiplier applied per attempt (`retry_backoff_factor`).
    pub multiplier: f64,
    /// Upper bound on any single delay.
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// Stateless retry policy. Computes the delay from the attempt number.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Total attempts allowed.
    pub fn max_attempts(&self) -> u32 {
        self.config.max_retries.max(1)
    }

    /// `base_delay * multiplier^attempt`, capped at `max_backoff`.
    /// `attempt` is the 0-based index of the attempt that just failed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.config.multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        let secs = self.config.base_delay.as_secs_f64() * factor;
        let cap = self.config.max_backoff.as_secs_f64();
        if !secs.is_finite() || secs >= cap {
            self.config.max_backoff
        } else {
            Duration::from_secs_f64(secs.max(0.0))
        }
    }

    /// Delay before the attempt following a failed `attempt`, or `None` if
    /// that was the last one. A server-supplied retry-after hint lengthens
    /// the delay but never shortens it, and never past `max_backoff`.
    pub fn next_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Option<Duration> {
        if attempt + 1 >= self.max_attempts() {
            return None;
        }
        let backoff = self.delay_for(attempt);
        Some(match retry_after {
            Some(hint) => backoff.max(hint.min(self.config.max_backoff)),
            None => backoff,
        })
    }
}
