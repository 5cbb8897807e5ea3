//! Trusted Relayer Service Library
//!
//! This crate relays authorized cross-chain function calls between two EVM
//! chains connected by mirrored bridge contracts. It watches blocks on each
//! chain, decodes `RequestForward` events emitted by the bridge, executes the
//! carried call on the opposite chain, and records an audit entry for every
//! confirmed relay.

pub mod bridge;
pub mod chain;
pub mod config;
pub mod crypto;
pub mod evm_client;
pub mod relay;
pub mod storage;

// Re-export commonly used types
pub use bridge::{BridgeEvent, ForwardRequest};
pub use chain::{Chain, ChainKind};
pub use config::{ChainConfig, Config, RelayerSettings, StorageConfig};
pub use crypto::RelaySigner;
pub use evm_client::{EvmClient, EvmLog};
pub use relay::Relayer;
pub use storage::{MessageStore, RelayedMessage};
