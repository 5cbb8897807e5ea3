//! Audit Storage Module
//!
//! This module provides the durable, append-only store of relayed messages.
//! Every confirmed relay appends exactly one record; records are never
//! updated or deleted by this service. No deduplication key is enforced:
//! replaying an event produces a second record.
//!
//! Records are stored as JSON lines in a single file so the audit trail can
//! be inspected and shipped with ordinary tooling.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Audit record of one confirmed relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayedMessage {
    /// Original message signer
    pub from_address: String,
    /// Target address of the relayed call
    pub to_address: String,
    /// Value carried with the call (hex quantity)
    pub value: String,
    /// Encoded target call
    pub data: String,
    /// User signature that authorized the call
    pub signature: String,
    /// Network the request was observed on ("HOME" or "FOREIGN")
    pub source_network: String,
    /// Network the execute transaction was confirmed on
    pub target_network: String,
    /// When the record was appended (UTC)
    pub relayed_at: DateTime<Utc>,
}

// ============================================================================
// MESSAGE STORE
// ============================================================================

/// Append-only JSON-lines store of relayed messages.
pub struct MessageStore {
    path: PathBuf,
    /// Serializes concurrent appends so lines never interleave
    write_lock: Mutex<()>,
}

impl MessageStore {
    /// Creates a store writing to the given file path.
    ///
    /// The file and its parent directory are created on first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Appends one record. Failure propagates to the caller; the relay has
    /// already been mined at this point, so a failed append means a missing
    /// audit entry, not a rolled-back relay.
    pub async fn append(&self, record: &RelayedMessage) -> Result<()> {
        let line = serde_json::to_string(record).context("Failed to serialize relayed message")?;

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create storage directory {}", parent.display())
                })?;
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open audit store {}", self.path.display()))?;

        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush()
            .await
            .with_context(|| format!("Failed to flush audit store {}", self.path.display()))?;

        Ok(())
    }

    /// Reads back all records, oldest first. Used by tests and audit tooling.
    pub async fn load_all(&self) -> Result<Vec<RelayedMessage>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read audit store {}", self.path.display())
                })
            }
        };

        let mut records = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            let record: RelayedMessage =
                serde_json::from_str(line).context("Malformed audit record")?;
            records.push(record);
        }
        Ok(records)
    }
}

// ============================================================================
// TESTS
// ============================================================================
