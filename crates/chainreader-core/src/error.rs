//! Error taxonomy shared by every ChainReader crate.

use std::time::Duration;

use thiserror::Error;

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, ChainReaderError>;

/// Errors surfaced by the pool, cache, executor and facade.
#[derive(Debug, Error)]
pub enum ChainReaderError {
    /// Address failed validation before any network attempt.
    #[error("Invalid address: {address}")]
    InvalidAddress { address: String },

    /// Block identifier failed validation before any network attempt.
    #[error("Invalid block identifier: {block_identifier}")]
    InvalidBlock { block_identifier: String },

    /// Transaction hash failed validation before any network attempt.
    #[error("Invalid transaction hash: {tx_hash}")]
    InvalidTxHash { tx_hash: String },

    /// Call data is not `0x`-prefixed, even-length hex.
    #[error("Invalid call data: {data}")]
    InvalidCallData { data: String },

    /// A single attempt against one provider failed.
    #[error("Provider {provider} error: {message}")]
    Provider { provider: String, message: String },

    /// The node answered with a JSON-RPC error object.
    #[error("Provider {provider} returned RPC error {code}: {message}")]
    Rpc {
        provider: String,
        code: i64,
        message: String,
    },

    /// The provider rejected the request because of rate limiting.
    #[error("Rate limit exceeded for provider {provider}{}", fmt_retry_after(.retry_after))]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    /// The attempt did not complete within the per-request timeout.
    #[error("Provider {provider} timed out after {ms}ms")]
    Timeout { provider: String, ms: u64 },

    /// The retry budget was exhausted without a successful attempt.
    #[error("All RPC providers have failed after {attempts} attempt(s){}", fmt_last_error(.last_error))]
    AllProvidersFailed {
        attempts: u32,
        last_error: Option<Box<ChainReaderError>>,
    },

    /// Reading or writing the cache store failed.
    #[error("Cache error: {0}")]
    Cache(String),

    /// Deterministic execution failure reported by the node (e.g. revert).
    #[error("Contract call to {address} ({method}) failed: {reason}")]
    ContractCall {
        address: String,
        method: String,
        reason: String,
    },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A response could not be deserialized.
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),
}

fn fmt_retry_after(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(d) => format!(" (retry after {}s)", d.as_secs_f64()),
        None => String::new(),
    }
}

fn fmt_last_error(last_error: &Option<Box<ChainReaderError>>) -> String {
    match last_error {
        Some(e) => format!(": last error: {e}"),
        None => String::new(),
    }
}

impl ChainReaderError {
    /// Build a provider error from anything displayable.
    pub fn provider(provider: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.to_string(),
        }
    }

    /// Returns `true` if this error is transient infrastructure failure
    /// that another attempt (possibly on another provider) may fix.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Provider { .. }
                | Self::Rpc { .. }
                | Self::RateLimited { .. }
                | Self::Timeout { .. }
        )
    }

    /// Returns `true` for input validation failures.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidAddress { .. }
                | Self::InvalidBlock { .. }
                | Self::InvalidTxHash { .. }
                | Self::InvalidCallData { .. }
        )
    }

    /// Name of the provider this error is attributed to, if any.
    pub fn provider_name(&self) -> Option<&str> {
        match self {
            Self::Provider { provider, .. }
            | Self::Rpc { provider, .. }
            | Self::RateLimited { provider, .. }
            | Self::Timeout { provider, .. } => Some(provider),
            _ => None,
        }
    }

    /// Retry-after hint carried by a rate-limit error.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_mentions_provider() {
        let e = ChainReaderError::provider("infura", "Connection failed");
        let msg = e.to_string();
        assert!(msg.contains("infura"));
        assert!(msg.contains("Connection failed"));
        assert_eq!(e.provider_name(), Some("infura"));
        assert!(e.is_retryable());
    }

    #[test]
    fn rate_limit_display() {
        let e = ChainReaderError::RateLimited {
            provider: "provider1".into(),
            retry_after: None,
        };
        assert!(e.to_string().contains("Rate limit exceeded"));
        assert!(e.retry_after().is_none());

        let e = ChainReaderError::RateLimited {
            provider: "provider2".into(),
            retry_after: Some(Duration::from_secs_f64(30.5)),
        };
        let msg = e.to_string();
        assert!(msg.contains("retry after 30.5"), "{msg}");
        assert_eq!(e.retry_after(), Some(Duration::from_secs_f64(30.5)));
    }

    #[test]
    fn all_providers_failed_carries_last_error() {
        let e = ChainReaderError::AllProvidersFailed {
            attempts: 3,
            last_error: Some(Box::new(ChainReaderError::provider("p3", "boom"))),
        };
        let msg = e.to_string();
        assert!(msg.contains("All RPC providers have failed"));
        assert!(msg.contains("boom"));
        assert!(!e.is_retryable());
    }

    #[test]
    fn validation_errors_are_not_retryable() {
        let e = ChainReaderError::InvalidAddress { address: "0xInvalid".into() };
        assert!(e.is_validation());
        assert!(!e.is_retryable());
        assert!(e.to_string().contains("0xInvalid"));

        let e = ChainReaderError::InvalidBlock { block_identifier: "12345".into() };
        assert!(e.to_string().contains("12345"));
    }

    #[test]
    fn contract_call_is_not_retryable() {
        let e = ChainReaderError::ContractCall {
            address: "0x123".into(),
            method: "balanceOf".into(),
            reason: "Execution reverted".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("0x123") && msg.contains("balanceOf"));
        assert!(!e.is_retryable());
        assert!(e.provider_name().is_none());
    }
}
