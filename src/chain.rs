//! Chain Handle Module
//!
//! A [`Chain`] bundles everything the relayer needs for one side of the
//! bridge: the JSON-RPC client, the chain id used for EIP-155 signing, the
//! watched contract addresses, and the lock serializing outgoing
//! transaction submission for the shared signing identity.
//!
//! Handles are constructed once at startup and immutable afterwards.

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::bridge::normalize_address;
use crate::config::ChainConfig;
use crate::evm_client::EvmClient;

/// Which side of the bridge a chain is on.
///
/// Purely relative labels; neither side is privileged. The destination of a
/// relay is always the opposite of its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainKind {
    Home,
    Foreign,
}

impl ChainKind {
    /// The other member of the pair.
    pub fn opposite(&self) -> ChainKind {
        match self {
            ChainKind::Home => ChainKind::Foreign,
            ChainKind::Foreign => ChainKind::Home,
        }
    }

    /// Network label recorded in audit entries.
    pub fn network_name(&self) -> &'static str {
        match self {
            ChainKind::Home => "HOME",
            ChainKind::Foreign => "FOREIGN",
        }
    }
}

/// Runtime handle for one chain.
#[derive(Debug)]
pub struct Chain {
    /// Human-readable chain name from configuration
    pub name: String,
    /// Home or Foreign
    pub kind: ChainKind,
    /// JSON-RPC client
    pub client: EvmClient,
    /// Chain id fetched at startup, used for EIP-155 signing
    pub chain_id: u64,
    /// Bridge contract address (normalized)
    pub bridge_addr: String,
    /// Counter contract address (normalized)
    pub counter_addr: String,
    /// Serializes nonce acquisition and raw-transaction submission for the
    /// shared signing identity on this chain
    pub submit_lock: tokio::sync::Mutex<()>,
}

impl Chain {
    /// Connects to a chain and builds its handle.
    ///
    /// Verifies the RPC endpoint by fetching the chain id. A failure here is
    /// fatal: it is logged with the chain name and returned to the caller,
    /// which terminates the process. There is no retry or fallback endpoint.
    pub async fn connect(config: &ChainConfig, kind: ChainKind) -> Result<Self> {
        info!("Initializing chain: {}", config.name);

        let client = EvmClient::new(&config.rpc_url)
            .with_context(|| format!("Failed to create RPC client for chain {}", config.name))?;

        let chain_id = match client.chain_id().await {
            Ok(id) => id,
            Err(e) => {
                error!("Error initializing chain {}: {:#}", config.name, e);
                return Err(e.context(format!("Failed to connect to chain {}", config.name)));
            }
        };

        info!(
            "Finished initializing chain: {} (chain_id={})",
            config.name, chain_id
        );

        Ok(Self {
            name: config.name.clone(),
            kind,
            client,
            chain_id,
            bridge_addr: normalize_address(&config.bridge_addr),
            counter_addr: normalize_address(&config.counter_addr),
            submit_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Whether a transaction destination is one of the watched contracts.
    ///
    /// Comparison is canonical (lowercased); `to == null` transactions never
    /// reach this point.
    pub fn watches_address(&self, to: &str) -> bool {
        let normalized = normalize_address(to);
        normalized == self.bridge_addr || normalized == self.counter_addr
    }

    /// Whether a log was emitted by this chain's bridge contract.
    pub fn is_bridge_log(&self, emitter: &str) -> bool {
        normalize_address(emitter) == self.bridge_addr
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_is_an_involution() {
        assert_eq!(ChainKind::Home.opposite(), ChainKind::Foreign);
        assert_eq!(ChainKind::Foreign.opposite(), ChainKind::Home);
        assert_eq!(ChainKind::Home.opposite().opposite(), ChainKind::Home);
    }

    #[test]
    fn test_network_names() {
        assert_eq!(ChainKind::Home.network_name(), "HOME");
        assert_eq!(ChainKind::Foreign.network_name(), "FOREIGN");
    }
}
