//! Configuration Management Module
//!
//! This module handles loading and managing configuration for the trusted
//! relayer service. Configuration includes the two chain endpoints, the
//! contract addresses watched on each chain, relay timing and retry
//! parameters, and the audit storage location.

use serde::{Deserialize, Serialize};

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Main configuration structure containing all service settings.
///
/// This structure holds configuration for:
/// - Home chain connection details
/// - Foreign chain connection details
/// - Relayer settings (signing key, polling, concurrency, retries)
/// - Audit storage location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Home chain configuration
    pub home_chain: ChainConfig,
    /// Foreign chain configuration
    pub foreign_chain: ChainConfig,
    /// Relayer configuration (key, timing, retries)
    pub relayer: RelayerSettings,
    /// Audit storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Configuration for one of the two bridged chains.
///
/// Contains everything needed to connect to the chain and recognize
/// transactions addressed to the contracts this relayer watches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Human-readable name for the chain
    pub name: String,
    /// JSON-RPC endpoint URL for chain communication
    pub rpc_url: String,
    /// Address of the bridge contract (emits forward requests, accepts execute)
    pub bridge_addr: String,
    /// Address of the counter contract (relay target, watched for filtering only)
    pub counter_addr: String,
}

/// Relayer settings including the signing key source and timing parameters.
///
/// The signing key is loaded from an environment variable at runtime; the
/// config file contains the environment variable name, never the key itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayerSettings {
    /// Environment variable name containing the secp256k1 private key (hex encoded)
    /// Default: "RELAYER_PRIVATE_KEY"
    #[serde(default = "default_private_key_env")]
    pub private_key_env: String,
    /// Polling interval for new-block detection in milliseconds
    pub polling_interval_ms: u64,
    /// Maximum number of block-processing tasks in flight per chain
    #[serde(default = "default_max_blocks_in_flight")]
    pub max_blocks_in_flight: usize,
    /// Number of attempts for submitting an execute transaction
    #[serde(default = "default_submit_attempts")]
    pub submit_attempts: u32,
    /// Backoff between submission attempts in milliseconds
    #[serde(default = "default_submit_backoff_ms")]
    pub submit_backoff_ms: u64,
}

fn default_private_key_env() -> String {
    "RELAYER_PRIVATE_KEY".to_string()
}

fn default_max_blocks_in_flight() -> usize {
    8
}

fn default_submit_attempts() -> u32 {
    3
}

fn default_submit_backoff_ms() -> u64 {
    1000
}

impl RelayerSettings {
    /// Loads the private key from the environment variable.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The private key (hex encoded, with or without 0x prefix)
    /// * `Err(anyhow::Error)` - Failed to load from environment
    pub fn get_private_key(&self) -> anyhow::Result<String> {
        std::env::var(&self.private_key_env).map_err(|_| {
            anyhow::anyhow!(
                "Environment variable '{}' not set. Please set it with your secp256k1 private key (hex encoded).",
                self.private_key_env
            )
        })
    }
}

/// Audit storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the append-only JSON-lines file holding relayed-message records
    #[serde(default = "default_storage_path")]
    pub path: String,
}

fn default_storage_path() -> String {
    "data/relayed-messages.jsonl".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

// ============================================================================
// CONFIGURATION LOADING AND MANAGEMENT
// ============================================================================

impl Config {
    /// Validates the configuration.
    ///
    /// This function ensures that:
    /// - Both chains carry well-formed 20-byte contract addresses
    /// - The two chains have distinct names and RPC endpoints
    /// - Timing and retry parameters are non-zero
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Configuration is valid
    /// - `Err(anyhow::Error)` - Invalid or conflicting values detected
    pub fn validate(&self) -> anyhow::Result<()> {
        for chain in [&self.home_chain, &self.foreign_chain] {
            if chain.name.trim().is_empty() {
                anyhow::bail!("Configuration error: chain name must not be empty");
            }
            validate_evm_address(&chain.bridge_addr)
                .map_err(|e| anyhow::anyhow!("{}: invalid bridge_addr: {}", chain.name, e))?;
            validate_evm_address(&chain.counter_addr)
                .map_err(|e| anyhow::anyhow!("{}: invalid counter_addr: {}", chain.name, e))?;
        }

        if self.home_chain.name == self.foreign_chain.name {
            anyhow::bail!(
                "Configuration error: home and foreign chains have the same name '{}'",
                self.home_chain.name
            );
        }

        if self.relayer.polling_interval_ms == 0 {
            anyhow::bail!("Configuration error: polling_interval_ms must be greater than zero");
        }

        if self.relayer.max_blocks_in_flight == 0 {
            anyhow::bail!("Configuration error: max_blocks_in_flight must be greater than zero");
        }

        if self.relayer.submit_attempts == 0 {
            anyhow::bail!("Configuration error: submit_attempts must be greater than zero");
        }

        Ok(())
    }

    /// Parses and validates a configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from the TOML file.
    ///
    /// This function:
    /// 1. Checks if config/trusted-relayer.toml exists (or TRUSTED_RELAYER_CONFIG_PATH)
    /// 2. If it exists, loads, parses and validates the configuration
    /// 3. If it doesn't exist, returns an error asking user to copy the template
    ///
    /// # Returns
    ///
    /// - `Ok(Config)` - Successfully loaded and validated configuration
    /// - `Err(anyhow::Error)` - Failed to load configuration or validation failed
    pub fn load() -> anyhow::Result<Self> {
        // Check for custom config path via environment variable (for tests)
        let config_path = std::env::var("TRUSTED_RELAYER_CONFIG_PATH")
            .unwrap_or_else(|_| "config/trusted-relayer.toml".to_string());

        if std::path::Path::new(&config_path).exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml_str(&content)
        } else {
            Err(anyhow::anyhow!(
                "Configuration file '{}' not found. Please copy the template:\n\
                cp config/trusted-relayer.template.toml config/trusted-relayer.toml\n\
                Then edit config/trusted-relayer.toml with your actual values.",
                config_path
            ))
        }
    }
}

/// Checks that a string is a well-formed 0x-prefixed 20-byte hex address.
fn validate_evm_address(addr: &str) -> anyhow::Result<()> {
    let clean = addr
        .strip_prefix("0x")
        .ok_or_else(|| anyhow::anyhow!("address '{}' missing 0x prefix", addr))?;
    let bytes = hex::decode(clean)
        .map_err(|_| anyhow::anyhow!("address '{}' is not valid hex", addr))?;
    if bytes.len() != 20 {
        anyhow::bail!("address '{}' is {} bytes, expected 20", addr, bytes.len());
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
