//! Bridge Contract Interface Module
//!
//! This module carries the fixed ABI of the mirrored bridge contracts: the
//! `RequestForward` / `RequestSucceeded` events and the `execute` entry
//! point. Both events and the function share one parameter list, so the
//! decoder and the calldata encoder operate on the same word layout.
//!
//! Event parameters are not indexed; everything lives in the log data as an
//! ABI-encoded tuple:
//! `(address from, address to, uint256 value, uint256 nonce, bytes data,
//!   uint256 bond, bytes signature)`

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::evm_client::EvmLog;

/// Canonical signature of the forward-request event.
pub const REQUEST_FORWARD_SIGNATURE: &str =
    "RequestForward(address,address,uint256,uint256,bytes,uint256,bytes)";

/// Canonical signature of the confirmation event emitted after execute.
pub const REQUEST_SUCCEEDED_SIGNATURE: &str =
    "RequestSucceeded(address,address,uint256,uint256,bytes,uint256,bytes)";

/// Canonical signature of the bridge execute entry point.
pub const EXECUTE_SIGNATURE: &str =
    "execute(address,address,uint256,uint256,bytes,uint256,bytes)";

// ============================================================================
// EVENT STRUCTURES
// ============================================================================

/// A decoded forward request, exactly as emitted on-chain.
///
/// All fields are 0x-prefixed hex strings. The relayer never validates or
/// recomputes them; the destination contract is responsible for rejecting
/// invalid or replayed requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardRequest {
    /// Original message signer
    pub from: String,
    /// Target address of the cross-chain call
    pub to: String,
    /// Value carried with the call (uint256)
    pub value: String,
    /// Request nonce (uint256)
    pub nonce: String,
    /// Encoded target call (selector + arguments)
    pub data: String,
    /// Bond posted by the requester (uint256)
    pub bond: String,
    /// User signature authorizing the call
    pub signature: String,
}

/// A recognized bridge event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    /// A pending cross-chain call awaiting relay
    RequestForward(ForwardRequest),
    /// Confirmation emitted after a relayed call executed
    RequestSucceeded(ForwardRequest),
}

// ============================================================================
// LOG DECODING
// ============================================================================

/// Computes the topic hash (keccak256) for an event signature.
pub fn event_topic(signature: &str) -> String {
    let mut hasher = Keccak256::new();
    hasher.update(signature.as_bytes());
    format!("0x{}", hex::encode(hasher.finalize()))
}

/// Normalizes an address for comparison: lowercased, 0x-prefixed.
pub fn normalize_address(addr: &str) -> String {
    let clean = addr.strip_prefix("0x").unwrap_or(addr);
    format!("0x{}", clean.to_lowercase())
}

/// Decodes a bridge log into a [`BridgeEvent`].
///
/// Returns `None` for unknown topics or malformed data; the caller treats
/// that as a silently skipped log, not an error.
pub fn parse_bridge_log(log: &EvmLog) -> Option<BridgeEvent> {
    let topic = log.topics.first()?.to_lowercase();
    let request = decode_request_data(&log.data)?;

    if topic == event_topic(REQUEST_FORWARD_SIGNATURE) {
        Some(BridgeEvent::RequestForward(request))
    } else if topic == event_topic(REQUEST_SUCCEEDED_SIGNATURE) {
        Some(BridgeEvent::RequestSucceeded(request))
    } else {
        None
    }
}

/// Decodes the shared ABI tuple from event data.
///
/// Word layout: from(0), to(1), value(2), nonce(3), offset-of-data(4),
/// bond(5), offset-of-signature(6), then the two dynamic tails.
fn decode_request_data(data: &str) -> Option<ForwardRequest> {
    let hex_data = data.strip_prefix("0x").unwrap_or(data);

    // Seven head words minimum
    if hex_data.len() < 7 * 64 {
        return None;
    }

    let word = |i: usize| hex_data.get(i * 64..(i + 1) * 64);

    let from = word_to_address(word(0)?)?;
    let to = word_to_address(word(1)?)?;
    let value = word_to_quantity(word(2)?)?;
    let nonce = word_to_quantity(word(3)?)?;
    let data_offset = word_to_usize(word(4)?)?;
    let bond = word_to_quantity(word(5)?)?;
    let signature_offset = word_to_usize(word(6)?)?;

    let call_data = decode_dynamic_bytes(hex_data, data_offset)?;
    let signature = decode_dynamic_bytes(hex_data, signature_offset)?;

    Some(ForwardRequest {
        from,
        to,
        value,
        nonce,
        data: call_data,
        bond,
        signature,
    })
}

/// Extracts an address from a 32-byte word (last 20 bytes).
fn word_to_address(word: &str) -> Option<String> {
    if word.len() != 64 || !word.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(format!("0x{}", word[24..64].to_lowercase()))
}

/// Extracts a uint256 as a minimal 0x-prefixed hex quantity ("0x0" for zero).
fn word_to_quantity(word: &str) -> Option<String> {
    if word.len() != 64 || !word.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let trimmed = word.trim_start_matches('0');
    if trimmed.is_empty() {
        Some("0x0".to_string())
    } else {
        Some(format!("0x{}", trimmed.to_lowercase()))
    }
}

/// Extracts a small uint256 (offset/length) as usize.
fn word_to_usize(word: &str) -> Option<usize> {
    if word.len() != 64 {
        return None;
    }
    let trimmed = word.trim_start_matches('0');
    if trimmed.is_empty() {
        return Some(0);
    }
    usize::from_str_radix(trimmed, 16).ok()
}

/// Decodes a dynamic `bytes` tail at the given byte offset.
fn decode_dynamic_bytes(hex_data: &str, byte_offset: usize) -> Option<String> {
    let start = byte_offset.checked_mul(2)?;
    let len_word = hex_data.get(start..start + 64)?;
    let len = word_to_usize(len_word)?;
    let content_start = start + 64;
    let content_end = content_start.checked_add(len.checked_mul(2)?)?;
    let content = hex_data.get(content_start..content_end)?;
    Some(format!("0x{}", content.to_lowercase()))
}

// ============================================================================
// CALLDATA ENCODING
// ============================================================================

/// ABI-encodes the shared parameter tuple of a forward request.
///
/// Returns the encoding as a 0x-prefixed hex string. This is the argument
/// block of an `execute` call, and identically the data block of the bridge
/// events.
pub fn encode_request_data(request: &ForwardRequest) -> Result<String> {
    let data_bytes = decode_hex_field(&request.data, "data")?;
    let signature_bytes = decode_hex_field(&request.signature, "signature")?;

    // Head: from, to, value, nonce, offset(data), bond, offset(signature)
    let head_size = 7 * 32;
    let data_offset = head_size;
    let signature_offset = data_offset + 32 + padded_len(data_bytes.len());

    let mut encoded = Vec::new();
    encoded.extend_from_slice(&address_word(&request.from)?);
    encoded.extend_from_slice(&address_word(&request.to)?);
    encoded.extend_from_slice(&quantity_word(&request.value)?);
    encoded.extend_from_slice(&quantity_word(&request.nonce)?);
    encoded.extend_from_slice(&usize_word(data_offset));
    encoded.extend_from_slice(&quantity_word(&request.bond)?);
    encoded.extend_from_slice(&usize_word(signature_offset));

    append_dynamic_bytes(&mut encoded, &data_bytes);
    append_dynamic_bytes(&mut encoded, &signature_bytes);

    Ok(format!("0x{}", hex::encode(encoded)))
}

/// ABI-encodes a full `execute` call: selector plus the request tuple.
pub fn encode_execute(request: &ForwardRequest) -> Result<String> {
    let mut hasher = Keccak256::new();
    hasher.update(EXECUTE_SIGNATURE.as_bytes());
    let hash = hasher.finalize();
    let selector = &hash[..4];

    let arguments = encode_request_data(request)?;
    let argument_hex = arguments.strip_prefix("0x").unwrap_or(&arguments);

    Ok(format!("0x{}{}", hex::encode(selector), argument_hex))
}

/// Left-pads a 20-byte address into a 32-byte word.
fn address_word(addr: &str) -> Result<[u8; 32]> {
    let bytes = decode_hex_field(addr, "address")?;
    if bytes.len() != 20 {
        anyhow::bail!("Address '{}' is {} bytes, expected 20", addr, bytes.len());
    }
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(&bytes);
    Ok(word)
}

/// Left-pads a hex quantity into a 32-byte word.
fn quantity_word(quantity: &str) -> Result<[u8; 32]> {
    let clean = quantity.strip_prefix("0x").unwrap_or(quantity);
    // hex::decode needs an even number of digits
    let padded = if clean.len() % 2 == 1 {
        format!("0{}", clean)
    } else {
        clean.to_string()
    };
    let bytes = hex::decode(&padded)
        .with_context(|| format!("Quantity '{}' is not valid hex", quantity))?;
    if bytes.len() > 32 {
        anyhow::bail!("Quantity '{}' exceeds 32 bytes", quantity);
    }
    let mut word = [0u8; 32];
    word[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(word)
}

fn usize_word(value: usize) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&(value as u64).to_be_bytes());
    word
}

fn decode_hex_field(value: &str, field: &str) -> Result<Vec<u8>> {
    let clean = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(clean).with_context(|| format!("Field '{}' is not valid hex: {}", field, value))
}

fn padded_len(len: usize) -> usize {
    len.div_ceil(32) * 32
}

/// Appends a length word plus right-padded content.
fn append_dynamic_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&usize_word(bytes.len()));
    out.extend_from_slice(bytes);
    let padding = padded_len(bytes.len()) - bytes.len();
    out.extend(std::iter::repeat(0u8).take(padding));
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> ForwardRequest {
        ForwardRequest {
            from: "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_string(),
            to: "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb".to_string(),
            value: "0x0".to_string(),
            nonce: "0x0".to_string(),
            data: "0x1234".to_string(),
            bond: "0x0".to_string(),
            signature: "0x010203".to_string(),
        }
    }

    /// Hand-assembled ABI encoding of [`sample_request`]:
    /// seven head words, then the two dynamic tails at offsets 0xe0 and 0x120.
    fn sample_request_hex() -> String {
        let mut words = String::new();
        // from
        words.push_str(&format!("{:0>64}", "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"));
        // to
        words.push_str(&format!("{:0>64}", "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"));
        // value = 0
        words.push_str(&"0".repeat(64));
        // nonce = 0
        words.push_str(&"0".repeat(64));
        // offset of data = 7 * 32 = 224 = 0xe0
        words.push_str(&format!("{:0>64}", "e0"));
        // bond = 0
        words.push_str(&"0".repeat(64));
        // offset of signature = 224 + 32 + 32 = 288 = 0x120
        words.push_str(&format!("{:0>64}", "120"));
        // data tail: length 2, content 0x1234 right-padded
        words.push_str(&format!("{:0>64}", "2"));
        words.push_str(&format!("{:0<64}", "1234"));
        // signature tail: length 3, content 0x010203 right-padded
        words.push_str(&format!("{:0>64}", "3"));
        words.push_str(&format!("{:0<64}", "010203"));
        words
    }

    #[test]
    fn test_encode_request_data_matches_hand_encoding() {
        let encoded = encode_request_data(&sample_request()).unwrap();
        assert_eq!(encoded, format!("0x{}", sample_request_hex()));
    }

    #[test]
    fn test_encode_execute_prepends_selector() {
        let calldata = encode_execute(&sample_request()).unwrap();
        // 0x + 4-byte selector + argument block
        assert_eq!(calldata.len(), 2 + 8 + sample_request_hex().len());
        assert_eq!(&calldata[10..], sample_request_hex());
    }

    #[test]
    fn test_decode_request_forward_log() {
        let log = EvmLog {
            address: "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string(),
            topics: vec![event_topic(REQUEST_FORWARD_SIGNATURE)],
            data: format!("0x{}", sample_request_hex()),
            block_number: Some("0x10".to_string()),
            transaction_hash: Some("0xabc".to_string()),
            log_index: Some("0x0".to_string()),
        };

        match parse_bridge_log(&log) {
            Some(BridgeEvent::RequestForward(request)) => {
                assert_eq!(request, sample_request());
            }
            other => panic!("expected RequestForward, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_request_succeeded_log() {
        let log = EvmLog {
            address: "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string(),
            topics: vec![event_topic(REQUEST_SUCCEEDED_SIGNATURE)],
            data: format!("0x{}", sample_request_hex()),
            block_number: None,
            transaction_hash: None,
            log_index: None,
        };
        assert!(matches!(
            parse_bridge_log(&log),
            Some(BridgeEvent::RequestSucceeded(_))
        ));
    }

    #[test]
    fn test_unknown_topic_is_skipped() {
        let log = EvmLog {
            address: "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string(),
            topics: vec![event_topic("Transfer(address,address,uint256)")],
            data: format!("0x{}", sample_request_hex()),
            block_number: None,
            transaction_hash: None,
            log_index: None,
        };
        assert!(parse_bridge_log(&log).is_none());
    }

    #[test]
    fn test_malformed_data_is_skipped() {
        let log = EvmLog {
            address: "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string(),
            topics: vec![event_topic(REQUEST_FORWARD_SIGNATURE)],
            data: "0xdeadbeef".to_string(),
            block_number: None,
            transaction_hash: None,
            log_index: None,
        };
        assert!(parse_bridge_log(&log).is_none());

        // Truncated tail: head words intact but signature content missing
        let truncated = sample_request_hex();
        let log = EvmLog {
            address: "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string(),
            topics: vec![event_topic(REQUEST_FORWARD_SIGNATURE)],
            data: format!("0x{}", &truncated[..truncated.len() - 64]),
            block_number: None,
            transaction_hash: None,
            log_index: None,
        };
        assert!(parse_bridge_log(&log).is_none());
    }

    #[test]
    fn test_normalize_address() {
        assert_eq!(
            normalize_address("0xAAaaAAaaAAaaAAaaAAaaAAaaAAaaAAaaAAaaAAaa"),
            "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"
        );
        assert_eq!(
            normalize_address("BBbbBBbbBBbbBBbbBBbbBBbbBBbbBBbbBBbbBBbb"),
            "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"
        );
    }

    #[test]
    fn test_event_topics_are_distinct() {
        assert_ne!(
            event_topic(REQUEST_FORWARD_SIGNATURE),
            event_topic(REQUEST_SUCCEEDED_SIGNATURE)
        );
    }

    #[test]
    fn test_quantity_round_trip_nonzero_values() {
        let request = ForwardRequest {
            value: "0xde0b6b3a7640000".to_string(), // 1 ether
            nonce: "0x2a".to_string(),
            bond: "0x64".to_string(),
            ..sample_request()
        };
        let encoded = encode_request_data(&request).unwrap();
        let decoded = decode_request_data(&encoded).unwrap();
        assert_eq!(decoded, request);
    }
}
