//! HTTP JSON-RPC client backed by `reqwest`.
//!
//! One client per configured provider. Reliability (retries, failover,
//! timeouts per attempt) lives in the executor; this client only classifies
//! what went wrong so the pool can account for it:
//!
//! - HTTP 429 → `RateLimited` (with `Retry-After` when present)
//! - other non-2xx, connection and body errors → `Provider`
//! - reqwest timeouts → `Timeout`
//! - JSON-RPC error objects → `Rpc`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use serde_json::Value;

use chainreader_core::error::{ChainReaderError, Result};
use chainreader_core::transport::RpcTransport;

use crate::wire::{IdGenerator, JsonRpcRequest, JsonRpcResponse};

/// Configuration for `HttpRpcClient`.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Hard ceiling for a single HTTP exchange.
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            user_agent: concat!("chainreader/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// HTTP JSON-RPC transport for a single provider.
pub struct HttpRpcClient {
    name: String,
    url: String,
    http: reqwest::Client,
    ids: IdGenerator,
    request_timeout: Duration,
}

impl HttpRpcClient {
    /// Create a client for the provider `name` at `url`.
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        config: HttpClientConfig,
    ) -> Result<Self> {
        let name = name.into();
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| {
                ChainReaderError::Config(format!("failed to build HTTP client for {name}: {e}"))
            })?;

        Ok(Self {
            name,
            url: url.into(),
            http,
            ids: IdGenerator::default(),
            request_timeout: config.request_timeout,
        })
    }

    /// Create with default configuration.
    pub fn default_for(name: impl Into<String>, url: impl Into<String>) -> Result<Self> {
        Self::new(name, url, HttpClientConfig::default())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn classify(&self, e: reqwest::Error) -> ChainReaderError {
        if e.is_timeout() {
            ChainReaderError::Timeout {
                provider: self.name.clone(),
                ms: self.request_timeout.as_millis() as u64,
            }
        } else {
            ChainReaderError::provider(&self.name, e)
        }
    }
}

/// Parse a `Retry-After` header given in seconds. Values that do not fit a
/// `Duration` are dropped.
fn parse_retry_after(value: &str) -> Option<Duration> {
    let secs = value.trim().parse::<f64>().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}

#[async_trait]
impl RpcTransport for HttpRpcClient {
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        let req = JsonRpcRequest::new(self.ids.next(), method, params);
        tracing::trace!(provider = %self.name, method, id = req.id, "sending request");

        let resp = self
            .http
            .post(&self.url)
            .json(&req)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            return Err(ChainReaderError::RateLimited {
                provider: self.name.clone(),
                retry_after,
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ChainReaderError::provider(
                &self.name,
                format!("HTTP {}: {body}", status.as_u16()),
            ));
        }

        let body: JsonRpcResponse = resp.json().await.map_err(|e| self.classify(e))?;
        body.into_result(&self.name)
    }

    fn url(&self) -> &str {
        &self.url
    }
}

impl std::fmt::Debug for HttpRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRpcClient")
            .field("name", &self.name)
            .field("url", &self.url)
            .finish()
    }
}
