//! EVM Client Module
//!
//! This module provides a client for communicating with EVM-compatible
//! blockchain nodes via their JSON-RPC API. It handles block and receipt
//! queries plus raw-transaction submission, and carries the RLP / EIP-155
//! glue needed to sign legacy transactions locally.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::time::Duration;

use crate::crypto::RelaySigner;

// ============================================================================
// WIRE STRUCTURES
// ============================================================================

/// EVM event log entry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EvmLog {
    /// Address of the contract that emitted the event
    pub address: String,
    /// Array of topics (indexed event parameters)
    pub topics: Vec<String>,
    /// Event data (non-indexed parameters)
    pub data: String,
    /// Block number (JSON-RPC uses camelCase: blockNumber)
    #[serde(rename = "blockNumber", default)]
    pub block_number: Option<String>,
    /// Transaction hash (JSON-RPC uses camelCase: transactionHash)
    #[serde(rename = "transactionHash", default)]
    pub transaction_hash: Option<String>,
    /// Log index (JSON-RPC uses camelCase: logIndex)
    #[serde(rename = "logIndex", default)]
    pub log_index: Option<String>,
}

/// A transaction as embedded in an eth_getBlockByNumber response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EvmBlockTransaction {
    /// Transaction hash
    pub hash: String,
    /// Sender address
    #[serde(default)]
    pub from: Option<String>,
    /// Destination address; None for contract-creation transactions
    #[serde(default)]
    pub to: Option<String>,
}

/// A block with full transaction bodies.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EvmBlock {
    /// Block number (hex string)
    pub number: String,
    /// Transactions included in the block
    #[serde(default)]
    pub transactions: Vec<EvmBlockTransaction>,
}

/// A transaction receipt.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EvmReceipt {
    /// Transaction status ("0x1" = success, "0x0" = failure)
    #[serde(default)]
    pub status: Option<String>,
    /// Block number the transaction was mined in (hex string)
    #[serde(rename = "blockNumber", default)]
    pub block_number: Option<String>,
    /// Logs emitted during execution
    #[serde(default)]
    pub logs: Vec<EvmLog>,
}

// ============================================================================
// EVM CLIENT IMPLEMENTATION
// ============================================================================

/// Client for communicating with an EVM-compatible node via JSON-RPC.
#[derive(Debug)]
pub struct EvmClient {
    /// HTTP client for making requests
    client: Client,
    /// Base URL of the EVM node (e.g., "http://127.0.0.1:8545")
    base_url: String,
}

impl EvmClient {
    /// Creates a new EVM client for the given node URL.
    pub fn new(node_url: &str) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: node_url.to_string(),
        })
    }

    /// Returns the base URL of this client.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Gets the chain id via eth_chainId.
    pub async fn chain_id(&self) -> Result<u64> {
        let hex: String = self.rpc("eth_chainId", vec![]).await?;
        parse_hex_u64(&hex).context("Failed to parse chain id")
    }

    /// Gets the current block number.
    pub async fn block_number(&self) -> Result<u64> {
        let hex: String = self.rpc("eth_blockNumber", vec![]).await?;
        parse_hex_u64(&hex).context("Failed to parse block number")
    }

    /// Fetches a block with full transaction bodies.
    ///
    /// Returns `None` if the node does not (yet) know the block.
    pub async fn get_block_with_transactions(&self, number: u64) -> Result<Option<EvmBlock>> {
        self.rpc(
            "eth_getBlockByNumber",
            vec![
                serde_json::json!(format!("0x{:x}", number)),
                serde_json::json!(true),
            ],
        )
        .await
    }

    /// Fetches a transaction receipt by hash.
    ///
    /// Returns `None` while the transaction is pending or unknown.
    pub async fn get_transaction_receipt(&self, hash: &str) -> Result<Option<EvmReceipt>> {
        self.rpc("eth_getTransactionReceipt", vec![serde_json::json!(hash)])
            .await
    }

    /// Gets the pending transaction count (next nonce) for an address.
    pub async fn transaction_count(&self, address: &str) -> Result<u64> {
        let hex: String = self
            .rpc(
                "eth_getTransactionCount",
                vec![serde_json::json!(address), serde_json::json!("pending")],
            )
            .await?;
        parse_hex_u64(&hex).context("Failed to parse transaction count")
    }

    /// Gets the current gas price.
    pub async fn gas_price(&self) -> Result<u64> {
        let hex: String = self.rpc("eth_gasPrice", vec![]).await?;
        parse_hex_u64(&hex).context("Failed to parse gas price")
    }

    /// Broadcasts a signed raw transaction and returns its hash.
    pub async fn send_raw_transaction(&self, raw_tx: &str) -> Result<String> {
        self.rpc("eth_sendRawTransaction", vec![serde_json::json!(raw_tx)])
            .await
    }

    /// Generic JSON-RPC call helper.
    async fn rpc<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<T> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1,
        });

        let response: serde_json::Value = self
            .client
            .post(&self.base_url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to send {} request to {}", method, self.base_url))?
            .json()
            .await
            .with_context(|| {
                format!("Failed to parse {} response from {}", method, self.base_url)
            })?;

        if let Some(error) = response.get("error") {
            let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            anyhow::bail!(
                "JSON-RPC error from {} ({}): {} (code: {})",
                self.base_url,
                method,
                message,
                code
            );
        }

        let result = response
            .get("result")
            .ok_or_else(|| anyhow::anyhow!("No result in {} response", method))?;

        serde_json::from_value(result.clone())
            .with_context(|| format!("Failed to deserialize {} result", method))
    }
}

// ============================================================================
// TRANSACTION SIGNING
// ============================================================================

/// Builds a signed legacy (pre-EIP-1559) transaction with a zero value.
///
/// RLP-encodes the transaction for EIP-155, signs the keccak256 hash with the
/// relayer's key, and returns the raw transaction hex ready for
/// eth_sendRawTransaction.
pub fn build_signed_transaction(
    signer: &RelaySigner,
    chain_id: u64,
    nonce: u64,
    gas_price: u64,
    gas_limit: u64,
    to: &str,
    calldata: &str,
) -> Result<String> {
    let to_hex = to.strip_prefix("0x").unwrap_or(to);
    let to_bytes = hex::decode(to_hex).context("Failed to decode 'to' address")?;

    let calldata_hex = calldata.strip_prefix("0x").unwrap_or(calldata);
    let data_bytes = hex::decode(calldata_hex).context("Failed to decode calldata")?;

    // RLP-encode unsigned tx for EIP-155 signing:
    // [nonce, gasPrice, gasLimit, to, value, data, chainId, 0, 0]
    let unsigned_items: Vec<Vec<u8>> = vec![
        rlp_encode_u64(nonce),
        rlp_encode_u64(gas_price),
        rlp_encode_u64(gas_limit),
        to_bytes.clone(),
        vec![], // value = 0
        data_bytes.clone(),
        rlp_encode_u64(chain_id),
        vec![], // 0
        vec![], // 0
    ];
    let unsigned_rlp = rlp_encode_list(&unsigned_items);

    let mut hasher = Keccak256::new();
    hasher.update(&unsigned_rlp);
    let tx_hash: [u8; 32] = hasher.finalize().into();

    let (r, s, recovery_id) = signer
        .sign_transaction_hash(&tx_hash)
        .context("Failed to sign transaction")?;

    // EIP-155 v value: recovery_id + chainId * 2 + 35
    let v = (recovery_id as u64) + chain_id * 2 + 35;

    // Signed tx RLP: [nonce, gasPrice, gasLimit, to, value, data, v, r, s]
    let signed_items: Vec<Vec<u8>> = vec![
        rlp_encode_u64(nonce),
        rlp_encode_u64(gas_price),
        rlp_encode_u64(gas_limit),
        to_bytes,
        vec![], // value = 0
        data_bytes,
        rlp_encode_u64(v),
        strip_leading_zeros(&r),
        strip_leading_zeros(&s),
    ];
    let signed_rlp = rlp_encode_list(&signed_items);

    Ok(format!("0x{}", hex::encode(signed_rlp)))
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Parses a 0x-prefixed hex quantity into a u64.
pub fn parse_hex_u64(value: &str) -> Result<u64> {
    let clean = value.strip_prefix("0x").unwrap_or(value);
    if clean.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(clean, 16).with_context(|| format!("Invalid hex quantity '{}'", value))
}

/// RLP integer encoding: big-endian with no leading zeros, empty for zero.
fn rlp_encode_u64(val: u64) -> Vec<u8> {
    if val == 0 {
        return vec![];
    }
    let bytes = val.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(8);
    bytes[start..].to_vec()
}

/// Drops leading zero bytes so r/s encode as RLP integers.
fn strip_leading_zeros(bytes: &[u8]) -> Vec<u8> {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    bytes[start..].to_vec()
}

/// RLP-encode a single byte-string item.
fn rlp_encode_item(data: &[u8]) -> Vec<u8> {
    if data.len() == 1 && data[0] < 0x80 {
        // Single byte below 0x80: encoded as itself
        vec![data[0]]
    } else if data.is_empty() {
        // Empty bytes: 0x80
        vec![0x80]
    } else if data.len() <= 55 {
        let mut out = vec![0x80 + data.len() as u8];
        out.extend_from_slice(data);
        out
    } else {
        let len_bytes = rlp_encode_u64(data.len() as u64);
        let mut out = vec![0xb7 + len_bytes.len() as u8];
        out.extend_from_slice(&len_bytes);
        out.extend_from_slice(data);
        out
    }
}

/// RLP-encode a list of items (each item is already raw bytes, NOT RLP-encoded).
fn rlp_encode_list(items: &[Vec<u8>]) -> Vec<u8> {
    let mut payload = Vec::new();
    for item in items {
        payload.extend(rlp_encode_item(item));
    }

    if payload.len() <= 55 {
        let mut out = vec![0xc0 + payload.len() as u8];
        out.extend(payload);
        out
    } else {
        let len_bytes = rlp_encode_u64(payload.len() as u64);
        let mut out = vec![0xf7 + len_bytes.len() as u8];
        out.extend_from_slice(&len_bytes);
        out.extend(payload);
        out
    }
}

// ============================================================================
// TESTS
// ============================================================================
