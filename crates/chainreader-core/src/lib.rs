//! chainreader-core: the resilience layer behind ChainReader.
//!
//! # Overview
//!
//! ChainReader reads blockchain data through a set of redundant JSON-RPC
//! providers. This crate holds everything that keeps those reads fast and
//! available, independent of how a provider is actually reached:
//!
//! - [`ProviderPool`]: priority/round-robin selection, consecutive-failure
//!   failover, cooldown recovery and forced recovery
//! - [`TtlCache`]: fingerprinted cache whose TTLs follow block finality
//! - [`Executor`]: cache lookup, retries with exponential backoff, per-attempt
//!   timeouts and pool bookkeeping around a caller-supplied network call
//! - [`ChainReaderError`]: the shared error taxonomy
//! - [`ChainReaderConfig`]: serde configuration for the whole stack
//! - [`RpcTransport`]: the per-provider transport seam

pub mod cache;
pub mod config;
pub mod error;
pub mod executor;
pub mod params;
pub mod policy;
pub mod pool;
pub mod transport;

pub use cache::{fingerprint, CacheConfig, CacheStats, Ttl, TtlCache};
pub use config::ChainReaderConfig;
pub use error::{ChainReaderError, Result};
pub use executor::Executor;
pub use params::{BlockRef, BlockTag, ParamValue, Params};
pub use policy::{RetryConfig, RetryPolicy};
pub use pool::{PoolConfig, Provider, ProviderConfig, ProviderPool, ProviderStats};
pub use transport::{HealthStatus, RpcTransport};
