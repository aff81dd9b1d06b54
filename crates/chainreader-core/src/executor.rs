//! Retry/execution coordinator.
//!
//! Per logical request:
//! ```text
//! PENDING ─▶ CACHE_HIT                                  (done, no provider touched)
//!    └────▶ ATTEMPTING(0) ─▶ SUCCESS                    (cache + mark_success)
//!               └─ FAILURE ─▶ backoff ─▶ ATTEMPTING(1) ─▶ ... ─▶ EXHAUSTED
//! ```
//! Only retryable (infrastructure) failures move to the next attempt;
//! validation and contract-logic errors are returned as-is.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::cache::TtlCache;
use crate::error::{ChainReaderError, Result};
use crate::params::Params;
use crate::policy::RetryPolicy;
use crate::pool::{Provider, ProviderPool};

/// Records a failure against the in-flight provider if the request future is
/// dropped before the attempt completes.
struct AttemptGuard<'a> {
    pool: &'a ProviderPool,
    provider: String,
    armed: bool,
}

impl<'a> AttemptGuard<'a> {
    fn new(pool: &'a ProviderPool, provider: &str) -> Self {
        Self {
            pool,
            provider: provider.to_string(),
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!(provider = %self.provider, "attempt cancelled");
            self.pool.mark_failure(&self.provider, "request cancelled");
        }
    }
}

/// Runs logical requests against the pool with caching and retries.
pub struct Executor {
    pool: Arc<ProviderPool>,
    cache: Arc<TtlCache<Value>>,
    retry: RetryPolicy,
    request_timeout: Duration,
}

impl Executor {
    pub fn new(
        pool: Arc<ProviderPool>,
        cache: Arc<TtlCache<Value>>,
        retry: RetryPolicy,
        request_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            cache,
            retry,
            request_timeout,
        }
    }

    pub fn pool(&self) -> &Arc<ProviderPool> {
        &self.pool
    }

    pub fn cache(&self) -> &Arc<TtlCache<Value>> {
        &self.cache
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Serve `method(params)` from cache or, on a miss, from the pool.
    ///
    /// `current_block` is the chain head used to decide whether a numbered
    /// block is final. `run` performs the network call on the provider it
    /// is handed; it may be invoked once per attempt.
    pub async fn execute<F, Fut>(
        &self,
        method: &str,
        params: &Params,
        current_block: Option<u64>,
        run: F,
    ) -> Result<Value>
    where
        F: Fn(Provider) -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        let key = self.cache.key(method, params);
        match self.cache.get(&key) {
            Ok(Some(value)) => {
                tracing::debug!(method, "cache hit");
                return Ok(value);
            }
            Ok(None) => tracing::debug!(method, "cache miss"),
            Err(e) => tracing::warn!(method, error = %e, "cache read failed, bypassing cache"),
        }

        let max_attempts = self.retry.max_attempts();
        let mut last_error = None;

        for attempt in 0..max_attempts {
            let provider = self.pool.select();
            let name = provider.name.clone();

            let guard = AttemptGuard::new(&self.pool, &name);
            let started = Instant::now();
            let outcome = match tokio::time::timeout(self.request_timeout, run(provider)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(ChainReaderError::Timeout {
                    provider: name.clone(),
                    ms: self.request_timeout.as_millis() as u64,
                }),
            };
            let latency = started.elapsed();
            guard.disarm();

            match outcome {
                Ok(value) => {
                    self.pool.mark_success(&name, latency);
                    let ttl = self.cache.determine_ttl(method, params, current_block);
                    // `null` for an immutable lookup means "not there yet".
                    if value.is_null() && ttl.is_permanent() {
                        tracing::debug!(method, "not caching null result");
                    } else if let Err(e) = self.cache.set(key.as_str(), value.clone(), ttl) {
                        tracing::warn!(method, error = %e, "cache write failed");
                    }
                    tracing::debug!(
                        method,
                        provider = %name,
                        attempt,
                        latency_ms = latency.as_millis() as u64,
                        "request succeeded"
                    );
                    return Ok(value);
                }
                Err(e) if e.is_retryable() => {
                    self.pool.mark_failure(&name, &e);
                    let delay = self.retry.next_delay(attempt, e.retry_after());
                    tracing::warn!(
                        method,
                        provider = %name,
                        attempt,
                        delay_ms = delay.map(|d| d.as_millis() as u64),
                        error = %e,
                        "attempt failed"
                    );
                    last_error = Some(e);
                    if let Some(delay) = delay {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => {
                    // The provider answered; the failure is in the request itself.
                    if matches!(e, ChainReaderError::ContractCall { .. }) {
                        self.pool.mark_success(&name, latency);
                    }
                    return Err(e);
                }
            }
        }

        tracing::error!(method, attempts = max_attempts, "all providers failed");
        Err(ChainReaderError::AllProvidersFailed {
            attempts: max_attempts,
            last_error: last_error.map(Box::new),
        })
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("pool", &self.pool)
            .field("retry", &self.retry)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
