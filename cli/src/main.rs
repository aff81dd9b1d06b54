//! chainreader CLI: read chain data through a failover provider pool.
//!
//! Usage:
//! ```bash
//! # Providers from a config file
//! chainreader block-number --config chainreader.json
//!
//! # Ad-hoc providers, in priority order
//! chainreader balance --address 0x742d35Cc6634C0532925a3b844Bc9e7595f0bEb0 \
//!     --url https://polygon-rpc.com --url https://rpc.ankr.com/polygon --chain-id 137
//!
//! # Provider and cache statistics as JSON
//! chainreader stats --config chainreader.json
//! ```

mod logging;

use std::env;
use std::process;

use anyhow::{bail, Context};
use chainreader_client::ChainReader;
use chainreader_core::{ChainReaderConfig, ProviderConfig};

const CONFIG_ENV: &str = "CHAINREADER_CONFIG";

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let flags = &args[2..];
    match command {
        "version" | "--version" | "-V" => {
            println!("chainreader {}", env!("CARGO_PKG_VERSION"));
            return;
        }
        "help" | "--help" | "-h" => {
            print_usage();
            return;
        }
        _ => {}
    }

    let level = parse_flag(flags, "--log-level").unwrap_or_else(|| "info".to_string());
    logging::init_tracing(&level, has_flag(flags, "--json-logs"));

    let result = match command {
        "block-number" => cmd_block_number(flags).await,
        "balance" => cmd_balance(flags).await,
        "block" => cmd_block(flags).await,
        "receipt" => cmd_receipt(flags).await,
        "stats" => cmd_stats(flags).await,
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn print_usage() {
    println!("chainreader {}", env!("CARGO_PKG_VERSION"));
    println!("Read blockchain data through redundant RPC providers\n");
    println!("USAGE:");
    println!("    chainreader <COMMAND> [FLAGS]\n");
    println!("COMMANDS:");
    println!("    block-number  Print the current head block number");
    println!("    balance       Print the balance of an address in wei");
    println!("    block         Print a block as JSON");
    println!("    receipt       Print a transaction receipt as JSON");
    println!("    stats         Probe the head block, then print provider and cache stats");
    println!("    version       Print version");
    println!("    help          Print this help\n");
    println!("COMMAND FLAGS:");
    println!("    --address <ADDR>  Account address           [balance]");
    println!("    --block <BLOCK>   Tag or number (default latest) [balance]");
    println!("    --number <BLOCK>  Tag or number             [block]");
    println!("    --hash <HASH>     Transaction hash          [receipt]\n");
    println!("GLOBAL FLAGS:");
    println!("    --config <PATH>     JSON config file (or ${CONFIG_ENV})");
    println!("    --url <URL>         Provider URL, repeatable, highest priority first");
    println!("    --chain-id <ID>     Chain id for --url providers (default 1)");
    println!("    --log-level <LVL>   trace | debug | info | warn | error (default info)");
    println!("    --json-logs         Emit JSON structured logs");
}

/// Build the reader from `--config`, `$CHAINREADER_CONFIG` or `--url` flags.
fn load_reader(flags: &[String]) -> anyhow::Result<ChainReader> {
    let config = match parse_flag(flags, "--config").or_else(|| env::var(CONFIG_ENV).ok()) {
        Some(path) => ChainReaderConfig::from_json_file(&path)
            .with_context(|| format!("loading config from {path}"))?,
        None => {
            let urls = parse_all(flags, "--url");
            if urls.is_empty() {
                bail!("no providers: pass --config <PATH>, set {CONFIG_ENV}, or give --url");
            }
            let chain_id = match parse_flag(flags, "--chain-id") {
                Some(id) => id.parse().with_context(|| format!("invalid --chain-id {id}"))?,
                None => 1,
            };
            let providers = urls
                .into_iter()
                .enumerate()
                .map(|(i, url)| {
                    ProviderConfig::new(format!("provider{}", i + 1), url).with_priority(i as u32 + 1)
                })
                .collect();
            ChainReaderConfig::new(chain_id, providers)
        }
    };
    Ok(ChainReader::new(config)?)
}

async fn cmd_block_number(flags: &[String]) -> anyhow::Result<()> {
    let reader = load_reader(flags)?;
    println!("{}", reader.get_block_number().await?);
    reader.close();
    Ok(())
}

async fn cmd_balance(flags: &[String]) -> anyhow::Result<()> {
    let address = parse_flag(flags, "--address").context("--address is required")?;
    let block = parse_flag(flags, "--block").unwrap_or_else(|| "latest".to_string());
    let reader = load_reader(flags)?;
    println!("{}", reader.get_balance(&address, &block).await?);
    reader.close();
    Ok(())
}

async fn cmd_block(flags: &[String]) -> anyhow::Result<()> {
    let number = parse_flag(flags, "--number").context("--number is required")?;
    let reader = load_reader(flags)?;
    match reader.get_block(&number, false).await? {
        Some(block) => println!("{}", serde_json::to_string_pretty(&block)?),
        None => bail!("block {number} not found"),
    }
    reader.close();
    Ok(())
}

async fn cmd_receipt(flags: &[String]) -> anyhow::Result<()> {
    let hash = parse_flag(flags, "--hash").context("--hash is required")?;
    let reader = load_reader(flags)?;
    match reader.get_transaction_receipt(&hash).await? {
        Some(receipt) => println!("{}", serde_json::to_string_pretty(&receipt)?),
        None => bail!("no receipt for {hash} (unknown or pending)"),
    }
    reader.close();
    Ok(())
}

async fn cmd_stats(flags: &[String]) -> anyhow::Result<()> {
    let reader = load_reader(flags)?;
    let head = match reader.get_block_number().await {
        Ok(n) => Some(n),
        Err(e) => {
            tracing::warn!(error = %e, "head probe failed");
            None
        }
    };
    let report = serde_json::json!({
        "chain_id": reader.chain_id(),
        "block_number": head,
        "health": reader.health().to_string(),
        "providers": reader.provider_stats(),
        "cache": reader.cache_stats(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    reader.close();
    Ok(())
}

fn parse_flag(args: &[String], flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    args.get(pos + 1).cloned()
}

fn parse_all(args: &[String], flag: &str) -> Vec<String> {
    args.windows(2)
        .filter(|w| w[0] == flag)
        .map(|w| w[1].clone())
        .collect()
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}
