//! Trusted Relayer Service
//!
//! A trusted message relay service that watches bridge contract events on two
//! EVM chains and delivers forwarded requests to the opposite chain.
//!
//! ## Overview
//!
//! The trusted relayer:
//! 1. Watches for `RequestForward` events on the home and foreign bridge contracts
//! 2. Delivers requests to the opposite chain by calling `execute`
//! 3. Records every confirmed relay in an append-only audit store
//!
//! ## Security Requirements
//!
//! **CRITICAL**: This service has the operator wallet key and can deliver
//! arbitrary requests. Ensure proper key management and access controls for
//! production use.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use trusted_relayer::{Config, Relayer};

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

/// Main application entry point that initializes and runs the trusted relayer.
///
/// This function:
/// 1. Initializes logging and tracing
/// 2. Loads configuration from TOML file
/// 3. Connects to both chains and initializes the relayer
/// 4. Runs the relayer until shutdown
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured logging for debugging and monitoring
    tracing_subscriber::fmt::init();

    info!("Starting Trusted Relayer Service");

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    // Check for help flag
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        println!("Trusted Relayer Service");
        println!();
        println!("Usage: trusted-relayer [OPTIONS]");
        println!();
        println!("Options:");
        println!("  --config <path>   Use custom config file path");
        println!("  --help, -h        Show this help message");
        println!();
        println!("Environment variables:");
        println!("  TRUSTED_RELAYER_CONFIG_PATH    Path to config file (overrides --config)");
        println!("  RELAYER_PRIVATE_KEY            Relayer signing key (hex)");
        return Ok(());
    }

    let mut config_path = None;

    let mut i = 1; // Skip program name
    while i < args.len() {
        if args[i] == "--config" && i + 1 < args.len() {
            config_path = Some(args[i + 1].clone());
            i += 1;
        }
        i += 1;
    }

    if let Some(path) = config_path {
        std::env::set_var("TRUSTED_RELAYER_CONFIG_PATH", &path);
        info!("Using custom config: {}", path);
    }

    // Load configuration from config/trusted-relayer.toml (or TRUSTED_RELAYER_CONFIG_PATH)
    let config = Config::load()?;
    info!("Configuration loaded successfully");

    let relayer = Arc::new(Relayer::connect(&config).await?);
    info!("Trusted relayer initialized successfully");

    // Run the relayer (this blocks until shutdown)
    relayer.run().await
}
