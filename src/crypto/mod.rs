//! Cryptographic Operations Module
//!
//! This module handles the relayer's signing identity: a single secp256k1
//! key shared by both chains, used to sign the `execute` transactions the
//! relayer submits on behalf of users.
//!
//! ## Security Requirements
//!
//! **CRITICAL**: The private key authorizes arbitrary relay submissions and
//! pays gas on both chains. It must never be exposed or logged.

use anyhow::Result;
use k256::ecdsa::{
    Signature as EcdsaSignature, SigningKey as EcdsaSigningKey, VerifyingKey as EcdsaVerifyingKey,
};
use sha3::{Digest, Keccak256};

// ============================================================================
// RELAY SIGNER IMPLEMENTATION
// ============================================================================

/// Signing identity of the relayer.
///
/// Wraps the secp256k1 key used on both chains. The same key signs on the
/// home and foreign chain; only the per-chain EIP-155 chain id differs.
pub struct RelaySigner {
    /// ECDSA signing key (secp256k1)
    signing_key: EcdsaSigningKey,
}

impl RelaySigner {
    /// Creates a signer from a hex-encoded 32-byte secret key.
    ///
    /// Accepts the key with or without a 0x prefix.
    pub fn from_hex(private_key_hex: &str) -> Result<Self> {
        let clean = private_key_hex
            .strip_prefix("0x")
            .unwrap_or(private_key_hex);
        let key_bytes = hex::decode(clean.trim())
            .map_err(|_| anyhow::anyhow!("Private key is not valid hex"))?;

        if key_bytes.len() != 32 {
            anyhow::bail!(
                "Invalid private key length: expected 32 bytes, got {}",
                key_bytes.len()
            );
        }

        let secret: [u8; 32] = key_bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("Failed to convert private key to array"))?;

        let signing_key = EcdsaSigningKey::from_bytes(&secret.into())
            .map_err(|e| anyhow::anyhow!("Failed to create ECDSA signing key: {}", e))?;

        Ok(Self { signing_key })
    }

    /// Signs a raw transaction hash with the ECDSA key.
    ///
    /// This does NOT apply the Ethereum signed message prefix — the caller is
    /// expected to pass a keccak256 hash of an RLP-encoded transaction.
    ///
    /// # Returns
    ///
    /// * `Ok((r, s, recovery_id))` — r and s are 32-byte big-endian, recovery_id is 0 or 1
    pub fn sign_transaction_hash(&self, tx_hash: &[u8; 32]) -> Result<([u8; 32], [u8; 32], u8)> {
        use k256::ecdsa::signature::hazmat::PrehashSigner;
        let signature: EcdsaSignature = self
            .signing_key
            .sign_prehash(tx_hash)
            .map_err(|e| anyhow::anyhow!("Failed to sign transaction hash: {}", e))?;

        let sig_bytes = signature.to_bytes();
        if sig_bytes.len() != 64 {
            anyhow::bail!(
                "Invalid signature length: expected 64 bytes, got {}",
                sig_bytes.len()
            );
        }

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&sig_bytes[..32]);
        s.copy_from_slice(&sig_bytes[32..64]);

        // Calculate recovery ID by trying both 0 and 1
        let verifying_key = self.signing_key.verifying_key();
        let public_key_point = verifying_key.to_encoded_point(false);
        let public_key_bytes = public_key_point.as_bytes();

        let recovery_id_0 = k256::ecdsa::RecoveryId::try_from(0u8)
            .map_err(|e| anyhow::anyhow!("Invalid recovery id: {}", e))?;
        let recovery_id = if let Ok(recovered) =
            EcdsaVerifyingKey::recover_from_prehash(tx_hash, &signature, recovery_id_0)
        {
            let recovered_point = recovered.to_encoded_point(false);
            if recovered_point.as_bytes() == public_key_bytes {
                0u8
            } else {
                1u8
            }
        } else {
            1u8
        };

        Ok((r, s, recovery_id))
    }

    /// Derives the Ethereum address from the ECDSA public key.
    ///
    /// The Ethereum address is computed as:
    /// keccak256(uncompressed_public_key)[12:32] (last 20 bytes)
    pub fn ethereum_address(&self) -> Result<String> {
        let verifying_key = self.signing_key.verifying_key();
        let public_key_point = verifying_key.to_encoded_point(false); // Uncompressed format
        let public_key_bytes = public_key_point.as_bytes();

        // Uncompressed format: 0x04 || x (32 bytes) || y (32 bytes) = 65 bytes total
        if public_key_bytes.len() != 65 || public_key_bytes[0] != 0x04 {
            anyhow::bail!("Invalid public key format: expected 65 bytes with 0x04 prefix");
        }

        // Hash the public key (without the 0x04 prefix)
        let mut hasher = Keccak256::new();
        hasher.update(&public_key_bytes[1..]);
        let hash = hasher.finalize();

        // Ethereum address is the last 20 bytes of the hash
        Ok(format!("0x{}", hex::encode(&hash[12..32])))
    }
}

// ============================================================================
// TESTS
// ============================================================================
