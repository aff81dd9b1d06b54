//! `ChainReader` over real HTTP transports against wiremock nodes.

use chainreader_client::ChainReader;
use chainreader_core::{ChainReaderConfig, ChainReaderError, ProviderConfig};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(urls: &[(&str, String)]) -> ChainReaderConfig {
    let providers = urls
        .iter()
        .enumerate()
        .map(|(i, (name, url))| ProviderConfig::new(*name, url.clone()).with_priority(i as u32 + 1))
        .collect();
    let mut config = ChainReaderConfig::new(137, providers);
    config.retry_base_delay = 0.01;
    config.max_backoff = 0.05;
    config.failover_threshold = 1;
    config.request_timeout = 2.0;
    config
}

async fn healthy_node() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "eth_blockNumber"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": "0x4b7"})),
        )
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn unavailable_primary_fails_over_to_backup() {
    let primary = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .expect(1)
        .mount(&primary)
        .await;
    let backup = healthy_node().await;

    let reader = ChainReader::new(config(&[
        ("primary", primary.uri()),
        ("backup", backup.uri()),
    ]))
    .unwrap();

    assert_eq!(reader.get_block_number().await.unwrap(), 1207);
    // Served from cache: neither node is asked again.
    assert_eq!(reader.get_block_number().await.unwrap(), 1207);

    let stats = reader.provider_stats();
    assert_eq!(stats["primary"].failure_count, 1);
    assert!(!stats["primary"].is_healthy);
    assert_eq!(stats["backup"].success_count, 1);
    assert_eq!(reader.cache_stats().hits, 1);
}

#[tokio::test]
async fn rate_limited_everywhere_is_exhaustion() {
    let a = MockServer::start().await;
    let b = MockServer::start().await;
    for server in [&a, &b] {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
            .mount(server)
            .await;
    }

    let reader = ChainReader::new(config(&[("a", a.uri()), ("b", b.uri())])).unwrap();
    let err = reader.get_chain_id().await.unwrap_err();
    match err {
        ChainReaderError::AllProvidersFailed { attempts, last_error } => {
            assert_eq!(attempts, 3);
            assert!(matches!(
                last_error.as_deref(),
                Some(ChainReaderError::RateLimited { .. })
            ));
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn revert_from_node_is_contract_error() {
    let node = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "eth_call"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0", "id": 1,
            "error": {"code": 3, "message": "execution reverted", "data": "0x08c379a0"}
        })))
        .expect(1)
        .mount(&node)
        .await;

    let reader = ChainReader::new(config(&[("node", node.uri())])).unwrap();
    let err = reader
        .call("0x742d35Cc6634C0532925a3b844Bc9e7595f0bEb0", "0x70a08231", "latest")
        .await
        .unwrap_err();
    assert!(matches!(err, ChainReaderError::ContractCall { .. }), "{err:?}");
    assert!(reader.provider_stats()["node"].is_healthy);
}
