//! chainreader-client: resilient, cached reads of EVM chain data.
//!
//! `ChainReader` spreads JSON-RPC reads over several providers, fails over
//! when one misbehaves and caches responses for as long as the chain allows:
//! head-relative reads for a few seconds, finalized blocks and transactions
//! forever.
//!
//! # Quick start
//! ```rust,no_run
//! use chainreader_client::ChainReader;
//! use chainreader_core::{ChainReaderConfig, ProviderConfig};
//!
//! # async fn run() -> chainreader_core::Result<()> {
//! let config = ChainReaderConfig::new(
//!     137,
//!     vec![
//!         ProviderConfig::new("infura", "https://polygon-mainnet.infura.io/v3/KEY").with_priority(1),
//!         ProviderConfig::new("public", "https://polygon-rpc.com").with_priority(2),
//!     ],
//! );
//! let reader = ChainReader::new(config)?;
//! let head = reader.get_block_number().await?;
//! let wei = reader
//!     .get_balance("0x742d35Cc6634C0532925a3b844Bc9e7595f0bEb0", "latest")
//!     .await?;
//! println!("block {head}: {wei} wei");
//! # Ok(())
//! # }
//! ```

pub mod decode;
pub mod reader;
pub mod validate;

pub use reader::ChainReader;
