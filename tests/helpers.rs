//! Shared helpers for relay integration tests
//!
//! Provides mock JSON-RPC chain servers, canned bridge events, and relayer
//! construction so individual tests stay focused on behavior.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::path::PathBuf;
use wiremock::matchers::{body_string_contains, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use trusted_relayer::bridge::{encode_request_data, event_topic};
use trusted_relayer::{
    Chain, ChainConfig, ChainKind, ForwardRequest, MessageStore, Relayer, RelaySigner,
    RelayerSettings,
};

// ============================================================================
// TEST CONSTANTS
// ============================================================================

/// Well-known test key; derives address 0x7e5f4552091a69125d5dfcb7b8c2659029395bdf
pub const TEST_PRIVATE_KEY: &str =
    "0000000000000000000000000000000000000000000000000000000000000001";

pub const HOME_BRIDGE_ADDR: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";
pub const HOME_COUNTER_ADDR: &str = "0xe7f1725e7734ce288f8367e1bb143e90bb3f0512";
pub const FOREIGN_BRIDGE_ADDR: &str = "0x9fe46736679d2d9a65f0992f2272de9f3c7fa6e0";
pub const FOREIGN_COUNTER_ADDR: &str = "0xcf7ed3acca5a467e9e704c703e8d87f634fb0fc9";
pub const UNRELATED_ADDR: &str = "0x1111111111111111111111111111111111111111";

pub const BRIDGE_TX_HASH: &str =
    "0xaaaa111111111111111111111111111111111111111111111111111111111111";
pub const EXECUTE_TX_HASH: &str =
    "0xbbbb222222222222222222222222222222222222222222222222222222222222";

// ============================================================================
// MOCK SERVER SETUP HELPERS
// ============================================================================

/// Wraps a result value in a JSON-RPC success envelope.
pub fn rpc_result(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "result": result,
    }))
}

/// JSON-RPC error envelope.
pub fn rpc_error(code: i64, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "error": {"code": code, "message": message},
    }))
}

/// Mounts a catch-all mock for one JSON-RPC method.
pub async fn mount_method(server: &MockServer, rpc_method: &str, result: Value) {
    Mock::given(method("POST"))
        .and(body_string_contains(rpc_method))
        .respond_with(rpc_result(result))
        .mount(server)
        .await;
}

/// Starts a mock chain server that answers eth_chainId.
pub async fn start_chain_server(chain_id_hex: &str) -> MockServer {
    let server = MockServer::start().await;
    mount_method(&server, "eth_chainId", json!(chain_id_hex)).await;
    server
}

/// Mounts the destination-side mocks for a successful execute submission:
/// nonce, gas price, broadcast, and a mined receipt.
pub async fn mount_successful_execution(server: &MockServer) {
    mount_method(server, "eth_getTransactionCount", json!("0x0")).await;
    mount_method(server, "eth_gasPrice", json!("0x3b9aca00")).await;
    mount_method(server, "eth_sendRawTransaction", json!(EXECUTE_TX_HASH)).await;
    mount_method(
        server,
        "eth_getTransactionReceipt",
        json!({"status": "0x1", "blockNumber": "0x20", "logs": []}),
    )
    .await;
}

// ============================================================================
// CHAIN AND RELAYER CONSTRUCTION
// ============================================================================

/// Connects a [`Chain`] handle to a mock server.
pub async fn connect_test_chain(server: &MockServer, kind: ChainKind) -> Chain {
    let (name, bridge_addr, counter_addr) = match kind {
        ChainKind::Home => ("HOME-TEST", HOME_BRIDGE_ADDR, HOME_COUNTER_ADDR),
        ChainKind::Foreign => ("FOREIGN-TEST", FOREIGN_BRIDGE_ADDR, FOREIGN_COUNTER_ADDR),
    };
    let config = ChainConfig {
        name: name.to_string(),
        rpc_url: server.uri(),
        bridge_addr: bridge_addr.to_string(),
        counter_addr: counter_addr.to_string(),
    };
    Chain::connect(&config, kind)
        .await
        .expect("mock chain should connect")
}

/// Relayer settings tuned for fast tests.
pub fn test_settings() -> RelayerSettings {
    RelayerSettings {
        private_key_env: "RELAYER_PRIVATE_KEY".to_string(),
        polling_interval_ms: 100,
        max_blocks_in_flight: 4,
        submit_attempts: 3,
        submit_backoff_ms: 10,
    }
}

/// Unique audit-store path under the system temp directory.
pub fn temp_store_path(tag: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("trusted-relayer-test-{}-{}.jsonl", tag, nanos))
}

/// Builds a relayer over two mock chain servers.
pub async fn build_relayer(
    home_server: &MockServer,
    foreign_server: &MockServer,
    store_path: &PathBuf,
) -> Relayer {
    build_relayer_with_settings(home_server, foreign_server, store_path, test_settings()).await
}

/// Builds a relayer with custom settings, for watcher and retry tests.
pub async fn build_relayer_with_settings(
    home_server: &MockServer,
    foreign_server: &MockServer,
    store_path: &PathBuf,
    settings: RelayerSettings,
) -> Relayer {
    let home = connect_test_chain(home_server, ChainKind::Home).await;
    let foreign = connect_test_chain(foreign_server, ChainKind::Foreign).await;
    let signer = RelaySigner::from_hex(TEST_PRIVATE_KEY).expect("test key is valid");
    Relayer::new(
        home,
        foreign,
        signer,
        MessageStore::new(store_path),
        settings,
    )
    .expect("relayer should build")
}

// ============================================================================
// CANNED EVENTS AND BLOCKS
// ============================================================================

/// A representative forward request with dynamic data and signature fields.
pub fn sample_forward_request() -> ForwardRequest {
    ForwardRequest {
        from: "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_string(),
        to: "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb".to_string(),
        value: "0xde0b6b3a7640000".to_string(),
        nonce: "0x7".to_string(),
        data: "0xd09de08a".to_string(),
        bond: "0x64".to_string(),
        signature: "0x0102030405060708".to_string(),
    }
}

/// A forward request distinguished by its call data and nonce, so tests
/// covering multiple relays can tell audit records apart.
pub fn forward_request_with(data: &str, nonce: &str) -> ForwardRequest {
    ForwardRequest {
        data: data.to_string(),
        nonce: nonce.to_string(),
        ..sample_forward_request()
    }
}

/// Builds the JSON form of a bridge event log for a mock receipt.
pub fn bridge_log_json(bridge_addr: &str, event_signature: &str, request: &ForwardRequest) -> Value {
    json!({
        "address": bridge_addr,
        "topics": [event_topic(event_signature)],
        "data": encode_request_data(request).expect("request encodes"),
        "blockNumber": "0x1",
        "transactionHash": BRIDGE_TX_HASH,
        "logIndex": "0x0",
    })
}

/// A transaction entry for a mock eth_getBlockByNumber response.
pub fn tx_json(hash: &str, to: Option<&str>) -> Value {
    json!({
        "hash": hash,
        "from": UNRELATED_ADDR,
        "to": to,
    })
}

/// A block body for a mock eth_getBlockByNumber response.
pub fn block_json(number_hex: &str, transactions: Vec<Value>) -> Value {
    json!({
        "number": number_hex,
        "transactions": transactions,
    })
}
