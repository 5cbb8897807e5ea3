//! ECDSA Key Generation Utility
//!
//! This binary generates a new secp256k1 key pair for the trusted relayer and
//! derives its Ethereum address.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin generate_key
//! ```
//!
//! ## Output
//!
//! - Private key (hex encoded) - for the RELAYER_PRIVATE_KEY environment variable
//! - EVM address (hex) - fund this address with gas on both chains

use k256::ecdsa::SigningKey;
use rand::Rng;
use sha3::{Digest, Keccak256};

fn main() {
    // Generate a new secp256k1 key pair
    let mut rng = rand::rngs::OsRng;
    let mut secret_key_bytes = [0u8; 32];
    rng.fill(&mut secret_key_bytes);
    let signing_key = SigningKey::from_bytes(&secret_key_bytes.into())
        .expect("Failed to create ECDSA signing key");
    let verifying_key = signing_key.verifying_key();

    // Derive EVM address: keccak256(uncompressed_pubkey)[12:32]
    let public_key_point = verifying_key.to_encoded_point(false);
    let public_key_bytes = public_key_point.as_bytes();
    // Skip the 0x04 prefix, hash the 64 bytes of x || y
    let mut keccak = Keccak256::new();
    keccak.update(&public_key_bytes[1..]);
    let keccak_hash = keccak.finalize();
    let evm_address = format!("0x{}", hex::encode(&keccak_hash[12..32]));

    println!("Generated secp256k1 Key Pair:");
    println!();
    println!("RELAYER_PRIVATE_KEY=0x{}", hex::encode(secret_key_bytes));
    println!("RELAYER_EVM_ADDRESS={}", evm_address);
    println!();
    println!("Export RELAYER_PRIVATE_KEY before starting the relayer and fund");
    println!("the address with gas on both chains.");
}
