//! chainreader-http: `reqwest`-backed JSON-RPC transport.
//!
//! ```rust,no_run
//! use chainreader_core::RpcTransport;
//! use chainreader_http::HttpRpcClient;
//!
//! # async fn run() -> chainreader_core::Result<()> {
//! let client = HttpRpcClient::default_for("public", "https://polygon-rpc.com")?;
//! let head = client.request("eth_blockNumber", vec![]).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod wire;

pub use client::{HttpClientConfig, HttpRpcClient};
pub use wire::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId};
