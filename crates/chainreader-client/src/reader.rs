//! The `ChainReader` facade.
//!
//! Each public method validates its input, builds the cache parameters,
//! and hands a network call to the [`Executor`], which takes care of caching,
//! provider selection, retries and failover.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::{json, Value};

use chainreader_core::cache::{CacheStats, TtlCache};
use chainreader_core::config::ChainReaderConfig;
use chainreader_core::error::{ChainReaderError, Result};
use chainreader_core::executor::Executor;
use chainreader_core::params::{BlockRef, Params};
use chainreader_core::policy::RetryPolicy;
use chainreader_core::pool::{Provider, ProviderPool, ProviderStats};
use chainreader_core::transport::{HealthStatus, RpcTransport};
use chainreader_http::{HttpClientConfig, HttpRpcClient};

use crate::{decode, validate};

/// JSON-RPC error code nodes use for reverted `eth_call`s.
const REVERT_CODE: i64 = 3;

/// Resilient, cached read access to one EVM chain.
pub struct ChainReader {
    chain_id: u64,
    executor: Executor,
    transports: HashMap<String, Arc<dyn RpcTransport>>,
}

impl ChainReader {
    /// Build a reader with one HTTP client per configured provider.
    pub fn new(config: ChainReaderConfig) -> Result<Self> {
        config.validate()?;
        let http = HttpClientConfig {
            request_timeout: config.request_timeout(),
            ..Default::default()
        };
        let mut transports: HashMap<String, Arc<dyn RpcTransport>> = HashMap::new();
        for p in &config.providers {
            let client = HttpRpcClient::new(p.name.clone(), p.url.clone(), http.clone())?;
            transports.insert(p.name.clone(), Arc::new(client));
        }
        Self::with_transports(config, transports)
    }

    /// Build a reader over caller-supplied transports, keyed by provider name.
    pub fn with_transports(
        config: ChainReaderConfig,
        transports: HashMap<String, Arc<dyn RpcTransport>>,
    ) -> Result<Self> {
        config.validate()?;
        if let Some(missing) = config
            .providers
            .iter()
            .find(|p| !transports.contains_key(&p.name))
        {
            return Err(ChainReaderError::Config(format!(
                "no transport for provider {}",
                missing.name
            )));
        }

        let pool = ProviderPool::new(config.providers.clone(), config.pool_config())?;
        let cache = TtlCache::new(config.cache_config());
        let executor = Executor::new(
            Arc::new(pool),
            Arc::new(cache),
            RetryPolicy::new(config.retry_config()),
            config.request_timeout(),
        );

        tracing::info!(
            chain_id = config.chain_id,
            providers = config.providers.len(),
            "ChainReader initialised"
        );

        Ok(Self {
            chain_id: config.chain_id,
            executor,
            transports,
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    // ── Chain reads ───────────────────────────────────────────────────────

    /// Current head block number.
    pub async fn get_block_number(&self) -> Result<u64> {
        let v = self
            .rpc("get_block_number", &Params::new(), None, "eth_blockNumber", vec![])
            .await?;
        decode::quantity_u64(&v)
    }

    /// Chain id as reported by the node.
    pub async fn get_chain_id(&self) -> Result<u64> {
        let v = self
            .rpc("get_chain_id", &Params::new(), None, "eth_chainId", vec![])
            .await?;
        decode::quantity_u64(&v)
    }

    /// Balance in wei.
    pub async fn get_balance(&self, address: &str, block: &str) -> Result<u128> {
        let address = validate::address(address)?;
        let block = validate::block(block)?;
        let v = self
            .account_query("get_balance", "eth_getBalance", &address, block)
            .await?;
        decode::quantity(&v)
    }

    /// Nonce of `address` at `block`.
    pub async fn get_transaction_count(&self, address: &str, block: &str) -> Result<u64> {
        let address = validate::address(address)?;
        let block = validate::block(block)?;
        let v = self
            .account_query("get_transaction_count", "eth_getTransactionCount", &address, block)
            .await?;
        decode::quantity_u64(&v)
    }

    /// Deployed bytecode at `address` (`0x` for externally owned accounts).
    pub async fn get_code(&self, address: &str, block: &str) -> Result<String> {
        let address = validate::address(address)?;
        let block = validate::block(block)?;
        let v = self
            .account_query("get_code", "eth_getCode", &address, block)
            .await?;
        Ok(serde_json::from_value(v)?)
    }

    /// Block by tag or number; `None` if the node does not know it yet.
    pub async fn get_block(&self, block: &str, full_transactions: bool) -> Result<Option<Value>> {
        let block = validate::block(block)?;
        let params = Params::new()
            .with("block_identifier", block.to_rpc_string())
            .with("full_transactions", full_transactions);
        let head = self.head_hint(block).await;
        let v = self
            .rpc(
                "get_block",
                &params,
                head,
                "eth_getBlockByNumber",
                vec![json!(block.to_rpc_string()), json!(full_transactions)],
            )
            .await?;
        decode::optional(v)
    }

    /// Transaction by hash; `None` if unknown.
    pub async fn get_transaction(&self, tx_hash: &str) -> Result<Option<Value>> {
        let tx_hash = validate::tx_hash(tx_hash)?;
        self.by_hash("get_transaction", "eth_getTransactionByHash", &tx_hash)
            .await
    }

    /// Receipt by transaction hash; `None` while pending or unknown.
    pub async fn get_transaction_receipt(&self, tx_hash: &str) -> Result<Option<Value>> {
        let tx_hash = validate::tx_hash(tx_hash)?;
        self.by_hash("get_transaction_receipt", "eth_getTransactionReceipt", &tx_hash)
            .await
    }

    /// Execute a read-only contract call and return the raw return data.
    ///
    /// A revert is reported as [`ChainReaderError::ContractCall`] and is not
    /// retried on other providers.
    pub async fn call(&self, to: &str, data: &str, block: &str) -> Result<String> {
        let to = validate::address(to)?;
        let data = validate::call_data(data)?;
        let block = validate::block(block)?;
        let params = Params::new()
            .with("to", to.as_str())
            .with("data", data.as_str())
            .with("block_identifier", block.to_rpc_string());
        let head = self.head_hint(block).await;
        let selector = data.get(..10).unwrap_or(data.as_str()).to_string();

        let v = self
            .rpc_mapped(
                "call",
                &params,
                head,
                "eth_call",
                vec![json!({ "to": to, "data": data }), json!(block.to_rpc_string())],
                |e| revert_to_contract_error(e, &to, &selector),
            )
            .await?;
        Ok(serde_json::from_value(v)?)
    }

    // ── Introspection ─────────────────────────────────────────────────────

    pub fn provider_stats(&self) -> BTreeMap<String, ProviderStats> {
        self.executor.pool().stats()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.executor.cache().stats()
    }

    pub fn health(&self) -> HealthStatus {
        self.executor.pool().health()
    }

    pub fn clear_cache(&self) -> Result<()> {
        self.executor.cache().clear()
    }

    /// Drop every cache entry whose key starts with `prefix`.
    ///
    /// Keys have the form `<method>:<digest>`, so `"get_balance:"` drops
    /// every cached balance. A bare `"get_transaction"` would also match
    /// `get_transaction_count` and `get_transaction_receipt`.
    pub fn invalidate(&self, prefix: &str) -> Result<usize> {
        self.executor.cache().invalidate(prefix)
    }

    /// Shut the reader down. Transports are released with it.
    pub fn close(self) {
        tracing::info!(chain_id = self.chain_id, "ChainReader closed");
    }

    // ── Internals ─────────────────────────────────────────────────────────

    async fn account_query(
        &self,
        method: &str,
        rpc_method: &str,
        address: &str,
        block: BlockRef,
    ) -> Result<Value> {
        let params = Params::new()
            .with("address", address)
            .with("block_identifier", block.to_rpc_string());
        let head = self.head_hint(block).await;
        self.rpc(
            method,
            &params,
            head,
            rpc_method,
            vec![json!(address), json!(block.to_rpc_string())],
        )
        .await
    }

    async fn by_hash(&self, method: &str, rpc_method: &str, tx_hash: &str) -> Result<Option<Value>> {
        let params = Params::new().with("tx_hash", tx_hash);
        let v = self
            .rpc(method, &params, None, rpc_method, vec![json!(tx_hash)])
            .await?;
        decode::optional(v)
    }

    /// Head block number used to decide finality of a numbered block.
    async fn head_hint(&self, block: BlockRef) -> Option<u64> {
        if block.is_head_relative() {
            return None;
        }
        match self.get_block_number().await {
            Ok(head) => Some(head),
            Err(e) => {
                tracing::warn!(error = %e, "could not fetch head block, using short TTL");
                None
            }
        }
    }

    async fn rpc(
        &self,
        method: &str,
        params: &Params,
        current_block: Option<u64>,
        rpc_method: &str,
        rpc_params: Vec<Value>,
    ) -> Result<Value> {
        self.rpc_mapped(method, params, current_block, rpc_method, rpc_params, |e| e)
            .await
    }

    async fn rpc_mapped<M>(
        &self,
        method: &str,
        params: &Params,
        current_block: Option<u64>,
        rpc_method: &str,
        rpc_params: Vec<Value>,
        map_err: M,
    ) -> Result<Value>
    where
        M: Fn(ChainReaderError) -> ChainReaderError,
    {
        let transports = &self.transports;
        let map_err = &map_err;
        let rpc_params = &rpc_params;
        self.executor
            .execute(method, params, current_block, |provider: Provider| {
                let transport = transports.get(&provider.name).cloned();
                async move {
                    match transport {
                        Some(t) => t.request(rpc_method, rpc_params.clone()).await.map_err(map_err),
                        None => Err(ChainReaderError::Config(format!(
                            "no transport for provider {}",
                            provider.name
                        ))),
                    }
                }
            })
            .await
    }
}

fn revert_to_contract_error(e: ChainReaderError, to: &str, selector: &str) -> ChainReaderError {
    match e {
        ChainReaderError::Rpc { code, message, .. }
            if code == REVERT_CODE || message.to_ascii_lowercase().contains("revert") =>
        {
            ChainReaderError::ContractCall {
                address: to.to_string(),
                method: selector.to_string(),
                reason: message,
            }
        }
        other => other,
    }
}

impl std::fmt::Debug for ChainReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainReader")
            .field("chain_id", &self.chain_id)
            .field("executor", &self.executor)
            .finish()
    }
}
