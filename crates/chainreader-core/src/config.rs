//! Top-level ChainReader configuration.
//!
//! Durations are expressed in (fractional) seconds so that configs read
//! naturally as JSON:
//!
//! ```json
//! {
//!   "chain_id": 137,
//!   "providers": [
//!     { "name": "infura",  "url": "https://polygon-mainnet.infura.io/v3/KEY", "priority": 1 },
//!     { "name": "public",  "url": "https://polygon-rpc.com", "priority": 2 }
//!   ],
//!   "max_retries": 5,
//!   "failover_threshold": 2
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;
use crate::error::{ChainReaderError, Result};
use crate::policy::RetryConfig;
use crate::pool::{PoolConfig, ProviderConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainReaderConfig {
    pub chain_id: u64,
    pub providers: Vec<ProviderConfig>,
    /// Seconds to cache numbered blocks still inside the finality margin.
    #[serde(default = "default_cache_ttl_blocks")]
    pub cache_ttl_blocks: f64,
    /// Seconds to cache head-relative queries.
    #[serde(default = "default_cache_ttl_latest")]
    pub cache_ttl_latest: f64,
    #[serde(default = "default_max_cache_size")]
    pub max_cache_size: usize,
    /// Blocks behind head after which data is treated as final.
    #[serde(default = "default_finality_margin")]
    pub finality_margin: u64,
    /// Attempts per logical request.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_factor")]
    pub retry_backoff_factor: f64,
    /// Seconds before the second attempt.
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay: f64,
    /// Cap on a single backoff delay, in seconds.
    #[serde(default = "default_max_backoff")]
    pub max_backoff: f64,
    #[serde(default = "default_failover_threshold")]
    pub failover_threshold: u32,
    /// Seconds before an unhealthy provider may recover.
    #[serde(default = "default_health_check_cooldown")]
    pub health_check_cooldown: f64,
    /// Per-attempt timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: f64,
}

fn default_cache_ttl_blocks() -> f64 { 60.0 }
fn default_cache_ttl_latest() -> f64 { 12.0 }
fn default_max_cache_size() -> usize { 10_000 }
fn default_finality_margin() -> u64 { 12 }
fn default_max_retries() -> u32 { 3 }
fn default_retry_backoff_factor() -> f64 { 2.0 }
fn default_retry_base_delay() -> f64 { 1.0 }
fn default_max_backoff() -> f64 { 30.0 }
fn default_failover_threshold() -> u32 { 3 }
fn default_health_check_cooldown() -> f64 { 300.0 }
fn default_request_timeout() -> f64 { 30.0 }

impl ChainReaderConfig {
    /// Config with defaults for everything but the chain and providers.
    pub fn new(chain_id: u64, providers: Vec<ProviderConfig>) -> Self {
        Self {
            chain_id,
            providers,
            cache_ttl_blocks: default_cache_ttl_blocks(),
            cache_ttl_latest: default_cache_ttl_latest(),
            max_cache_size: default_max_cache_size(),
            finality_margin: default_finality_margin(),
            max_retries: default_max_retries(),
            retry_backoff_factor: default_retry_backoff_factor(),
            retry_base_delay: default_retry_base_delay(),
            max_backoff: default_max_backoff(),
            failover_threshold: default_failover_threshold(),
            health_check_cooldown: default_health_check_cooldown(),
            request_timeout: default_request_timeout(),
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ChainReaderError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.providers.is_empty() {
            return Err(ChainReaderError::Config(
                "At least one provider must be configured".into(),
            ));
        }
        if self.max_cache_size == 0 {
            return Err(ChainReaderError::Config("max_cache_size must be > 0".into()));
        }
        if self.max_retries == 0 {
            return Err(ChainReaderError::Config("max_retries must be > 0".into()));
        }
        if self.failover_threshold == 0 {
            return Err(ChainReaderError::Config("failover_threshold must be > 0".into()));
        }
        if self.retry_backoff_factor < 1.0 || !self.retry_backoff_factor.is_finite() {
            return Err(ChainReaderError::Config(
                "retry_backoff_factor must be a finite number >= 1.0".into(),
            ));
        }
        for (field, value) in [
            ("cache_ttl_blocks", self.cache_ttl_blocks),
            ("cache_ttl_latest", self.cache_ttl_latest),
            ("retry_base_delay", self.retry_base_delay),
            ("max_backoff", self.max_backoff),
            ("health_check_cooldown", self.health_check_cooldown),
            ("request_timeout", self.request_timeout),
        ] {
            if Duration::try_from_secs_f64(value).is_err() {
                return Err(ChainReaderError::Config(format!(
                    "{field} must be a non-negative number of seconds, got {value}"
                )));
            }
        }
        if self.request_timeout == 0.0 {
            return Err(ChainReaderError::Config("request_timeout must be > 0".into()));
        }
        Ok(())
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            cache_ttl_blocks: seconds(self.cache_ttl_blocks),
            cache_ttl_latest: seconds(self.cache_ttl_latest),
            max_cache_size: self.max_cache_size,
            finality_margin: self.finality_margin,
        }
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            failover_threshold: self.failover_threshold,
            health_check_cooldown: seconds(self.health_check_cooldown),
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            base_delay: seconds(self.retry_base_delay),
            multiplier: self.retry_backoff_factor,
            max_backoff: seconds(self.max_backoff),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        seconds(self.request_timeout)
    }
}

/// Saturating seconds-to-`Duration` for configs that skipped `validate`.
fn seconds(value: f64) -> Duration {
    if value.is_nan() || value <= 0.0 {
        Duration::ZERO
    } else {
        Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_json_with_defaults() {
        let cfg = ChainReaderConfig::from_json_str(
            r#"{
                "chain_id": 137,
                "providers": [
                    {"name": "provider1", "url": "https://rpc1.example.com", "priority": 1},
                    {"name": "provider2", "url": "https://rpc2.example.com"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.chain_id, 137);
        assert_eq!(cfg.providers.len(), 2);
        assert_eq!(cfg.providers[0].priority, Some(1));
        assert_eq!(cfg.providers[1].priority, None);
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.finality_margin, 12);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn custom_values_flow_into_component_configs() {
        let mut cfg = ChainReaderConfig::new(1, vec![ProviderConfig::new("a", "https://a")]);
        cfg.cache_ttl_blocks = 20.0;
        cfg.cache_ttl_latest = 10.0;
        cfg.max_cache_size = 5000;
        cfg.max_retries = 5;
        cfg.retry_backoff_factor = 3.0;
        cfg.failover_threshold = 5;
        cfg.health_check_cooldown = 600.0;
        cfg.validate().unwrap();

        let cache = cfg.cache_config();
        assert_eq!(cache.cache_ttl_blocks, Duration::from_secs(20));
        assert_eq!(cache.cache_ttl_latest, Duration::from_secs(10));
        assert_eq!(cache.max_cache_size, 5000);

        let pool = cfg.pool_config();
        assert_eq!(pool.failover_threshold, 5);
        assert_eq!(pool.health_check_cooldown, Duration::from_secs(600));

        let retry = cfg.retry_config();
        assert_eq!(retry.max_retries, 5);
        assert_eq!(retry.multiplier, 3.0);
    }

    #[test]
    fn rejects_empty_providers() {
        let err = ChainReaderConfig::from_json_str(r#"{"chain_id": 1, "providers": []}"#)
            .unwrap_err();
        assert!(matches!(err, ChainReaderError::Config(_)));
    }

    #[test]
    fn rejects_zero_cache_size() {
        let mut cfg = ChainReaderConfig::new(1, vec![ProviderConfig::new("a", "https://a")]);
        cfg.max_cache_size = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_durations_that_overflow() {
        for field in ["health_check_cooldown", "cache_ttl_blocks", "request_timeout", "max_backoff"] {
            let json = format!(
                r#"{{"chain_id": 1, "providers": [{{"name": "a", "url": "https://a"}}], "{field}": 1e20}}"#
            );
            let err = ChainReaderConfig::from_json_str(&json).unwrap_err();
            assert!(matches!(err, ChainReaderError::Config(ref m) if m.contains(field)), "{err:?}");
        }

        let mut cfg = ChainReaderConfig::new(1, vec![ProviderConfig::new("a", "https://a")]);
        cfg.retry_base_delay = -1.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unvalidated_durations_saturate() {
        let mut cfg = ChainReaderConfig::new(1, vec![ProviderConfig::new("a", "https://a")]);
        cfg.health_check_cooldown = 1e20;
        cfg.cache_ttl_latest = f64::NAN;
        assert_eq!(cfg.pool_config().health_check_cooldown, Duration::MAX);
        assert_eq!(cfg.cache_config().cache_ttl_latest, Duration::ZERO);
    }

    #[test]
    fn malformed_json_is_deserialization_error() {
        let err = ChainReaderConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ChainReaderError::Deserialization(_)));
    }
}
