//! The `RpcTransport` trait: how a single provider is actually reached.
//!
//! The executor is transport-agnostic: it only needs a capability that, given
//! a selected [`Provider`](crate::pool::Provider), performs the call. The
//! facade builds that capability from one `RpcTransport` per provider.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Aggregate pool health.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Every provider is healthy.
    Healthy,
    /// Some providers are unhealthy.
    Degraded,
    /// No provider is healthy; the next selection will force recovery.
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// A JSON-RPC endpoint for one provider.
///
/// Implementations must be `Send + Sync` and are stored as
/// `Arc<dyn RpcTransport>`. Errors should be attributed to the provider
/// (`Provider`, `Rpc`, `RateLimited` or `Timeout`) so that the pool can
/// account for them.
#[async_trait]
pub trait RpcTransport: Send + Sync + 'static {
    /// Call `method` with positional JSON-RPC params and return the `result`.
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value>;

    /// Endpoint URL.
    fn url(&self) -> &str;
}
