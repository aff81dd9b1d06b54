//! Priority-ordered provider pool with health tracking, failover and
//! cooldown-based recovery.
//!
//! Selection picks the lowest `priority` value among healthy providers and
//! rotates round-robin among providers sharing that priority. A provider is
//! marked unhealthy after `failover_threshold` consecutive failures and
//! becomes eligible again once `health_check_cooldown` has passed since its
//! last failure. When nothing is healthy the pool force-recovers every
//! provider so that `select` always yields a candidate.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{ChainReaderError, Result};
use crate::transport::HealthStatus;

/// Priority assigned to providers configured without one.
pub const DEFAULT_PRIORITY: u32 = 100;

/// One configured endpoint, as read from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    pub url: String,
    /// Lower is preferred.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
}

impl ProviderConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            priority: None,
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// Pool behaviour knobs.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Consecutive failures before a provider is marked unhealthy.
    pub failover_threshold: u32,
    /// Time after the last failure before an unhealthy provider may recover.
    pub health_check_cooldown: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            failover_threshold: 3,
            health_check_cooldown: Duration::from_secs(300),
        }
    }
}

/// A provider and its health statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct Provider {
    pub name: String,
    pub url: String,
    pub priority: u32,
    pub is_healthy: bool,
    /// Consecutive failures; reset on success.
    pub failure_count: u32,
    pub success_count: u64,
    /// Successes plus failures.
    pub request_count: u64,
    pub total_latency: Duration,
    pub last_failure_time: Option<Instant>,
}

impl Provider {
    pub fn new(name: impl Into<String>, url: impl Into<String>, priority: u32) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            priority,
            is_healthy: true,
            failure_count: 0,
            success_count: 0,
            request_count: 0,
            total_latency: Duration::ZERO,
            last_failure_time: None,
        }
    }

    /// `1.0` until anything has been recorded.
    pub fn success_rate(&self) -> f64 {
        let attempts = self.success_count + u64::from(self.failure_count);
        if attempts == 0 {
            1.0
        } else {
            self.success_count as f64 / attempts as f64
        }
    }

    /// Total latency spread over every recorded attempt.
    pub fn average_latency(&self) -> Duration {
        if self.request_count == 0 {
            Duration::ZERO
        } else {
            self.total_latency.div_f64(self.request_count as f64)
        }
    }
}

impl From<ProviderConfig> for Provider {
    fn from(cfg: ProviderConfig) -> Self {
        Provider::new(cfg.name, cfg.url, cfg.priority.unwrap_or(DEFAULT_PRIORITY))
    }
}

/// Serializable per-provider snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderStats {
    pub url: String,
    pub priority: u32,
    pub is_healthy: bool,
    pub request_count: u64,
    pub success_count: u64,
    pub failure_count: u32,
    pub success_rate: f64,
    /// Seconds.
    pub average_latency: f64,
    /// Seconds.
    pub total_latency: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds_since_last_failure: Option<f64>,
}

impl ProviderStats {
    fn snapshot(p: &Provider, now: Instant) -> Self {
        Self {
            url: p.url.clone(),
            priority: p.priority,
            is_healthy: p.is_healthy,
            request_count: p.request_count,
            success_count: p.success_count,
            failure_count: p.failure_count,
            success_rate: p.success_rate(),
            average_latency: p.average_latency().as_secs_f64(),
            total_latency: p.total_latency.as_secs_f64(),
            seconds_since_last_failure: p
                .last_failure_time
                .map(|t| now.saturating_duration_since(t).as_secs_f64()),
        }
    }
}

struct PoolInner {
    /// Configuration order.
    providers: Vec<Provider>,
    cursor: usize,
}

impl PoolInner {
    fn find_mut(&mut self, name: &str) -> Option<&mut Provider> {
        self.providers.iter_mut().find(|p| p.name == name)
    }
}

/// Shared provider pool.
pub struct ProviderPool {
    config: PoolConfig,
    inner: Mutex<PoolInner>,
}

impl ProviderPool {
    /// Build a pool from provider configs.
    pub fn new(providers: Vec<ProviderConfig>, config: PoolConfig) -> Result<Self> {
        if providers.is_empty() {
            return Err(ChainReaderError::Config(
                "At least one provider must be configured".into(),
            ));
        }
        if config.failover_threshold == 0 {
            return Err(ChainReaderError::Config(
                "failover_threshold must be at least 1".into(),
            ));
        }
        let mut seen = HashSet::new();
        for p in &providers {
            if !seen.insert(p.name.as_str()) {
                return Err(ChainReaderError::Config(format!(
                    "duplicate provider name: {}",
                    p.name
                )));
            }
        }

        let providers: Vec<Provider> = providers.into_iter().map(Provider::from).collect();
        tracing::debug!(count = providers.len(), "provider pool initialised");
        Ok(Self {
            config,
            inner: Mutex::new(PoolInner {
                providers,
                cursor: 0,
            }),
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Number of providers in the pool.
    pub fn len(&self) -> usize {
        self.lock().providers.len()
    }

    /// Always `false`: construction rejects an empty provider list.
    pub fn is_empty(&self) -> bool {
        self.lock().providers.is_empty()
    }

    /// Snapshot of one provider.
    pub fn get(&self, name: &str) -> Option<Provider> {
        self.lock().providers.iter().find(|p| p.name == name).cloned()
    }

    /// Choose the provider for the next attempt.
    pub fn select(&self) -> Provider {
        let now = Instant::now();
        let mut inner = self.lock();
        self.recover_locked(&mut inner, now);

        if !inner.providers.iter().any(|p| p.is_healthy) {
            tracing::warn!("no healthy providers left, forcing recovery of all providers");
            for p in inner.providers.iter_mut() {
                p.is_healthy = true;
                p.failure_count = 0;
            }
        }

        let best = inner
            .providers
            .iter()
            .filter(|p| p.is_healthy)
            .map(|p| p.priority)
            .min()
            .unwrap_or(DEFAULT_PRIORITY);
        let candidates: Vec<usize> = inner
            .providers
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_healthy && p.priority == best)
            .map(|(i, _)| i)
            .collect();

        let idx = candidates[inner.cursor % candidates.len()];
        inner.cursor = inner.cursor.wrapping_add(1);
        let chosen = inner.providers[idx].clone();
        tracing::trace!(provider = %chosen.name, priority = chosen.priority, "selected provider");
        chosen
    }

    /// Record a successful attempt.
    pub fn mark_success(&self, name: &str, latency: Duration) {
        let mut inner = self.lock();
        let Some(p) = inner.find_mut(name) else {
            tracing::warn!(provider = name, "mark_success called for unknown provider");
            return;
        };
        p.success_count += 1;
        p.request_count += 1;
        p.total_latency += latency;
        p.failure_count = 0;
        if !p.is_healthy {
            tracing::info!(provider = name, "provider healthy again");
        }
        p.is_healthy = true;
    }

    /// Record a failed attempt.
    pub fn mark_failure(&self, name: &str, error: impl std::fmt::Display) {
        let threshold = self.config.failover_threshold;
        let mut inner = self.lock();
        let Some(p) = inner.find_mut(name) else {
            tracing::warn!(provider = name, %error, "mark_failure called for unknown provider");
            return;
        };
        p.failure_count += 1;
        p.request_count += 1;
        tracing::debug!(provider = name, failures = p.failure_count, %error, "provider attempt failed");

        if p.failure_count >= threshold {
            if p.is_healthy {
                tracing::warn!(
                    provider = name,
                    failures = p.failure_count,
                    "provider marked unhealthy"
                );
            }
            p.is_healthy = false;
            p.last_failure_time = Some(Instant::now());
        }
    }

    /// Restore unhealthy providers whose cooldown has elapsed at `now`.
    /// Returns how many were recovered.
    pub fn recover(&self, now: Instant) -> usize {
        let mut inner = self.lock();
        self.recover_locked(&mut inner, now)
    }

    fn recover_locked(&self, inner: &mut PoolInner, now: Instant) -> usize {
        let cooldown = self.config.health_check_cooldown;
        let mut recovered = 0;
        for p in inner.providers.iter_mut().filter(|p| !p.is_healthy) {
            let cooled = p
                .last_failure_time
                .map_or(true, |t| now.saturating_duration_since(t) >= cooldown);
            if cooled {
                p.is_healthy = true;
                p.failure_count = 0;
                recovered += 1;
                tracing::info!(provider = %p.name, "provider recovered after cooldown");
            }
        }
        recovered
    }

    /// Per-provider statistics keyed by name.
    pub fn stats(&self) -> BTreeMap<String, ProviderStats> {
        let now = Instant::now();
        self.lock()
            .providers
            .iter()
            .map(|p| (p.name.clone(), ProviderStats::snapshot(p, now)))
            .collect()
    }

    /// Aggregate health of the pool.
    pub fn health(&self) -> HealthStatus {
        let inner = self.lock();
        let healthy = inner.providers.iter().filter(|p| p.is_healthy).count();
        match healthy {
            0 => HealthStatus::Unhealthy,
            n if n == inner.providers.len() => HealthStatus::Healthy,
            _ => HealthStatus::Degraded,
        }
    }

    // Counters stay meaningful even if a holder panicked mid-update.
    fn lock(&self) -> MutexGuard<'_, PoolInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ProviderPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderPool")
            .field("providers", &self.len())
            .field("health", &self.health())
            .finish()
    }
}
