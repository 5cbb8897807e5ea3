//! Relay Engine Module
//!
//! The dual-chain relay core: block watching, transaction filtering, log
//! decoding, and cross-chain execute dispatch.
//!
//! ## Architecture
//!
//! Each chain runs an independent watcher loop that polls for new block
//! heights and spawns one bounded task per block. Within a block, matching
//! transactions fan out concurrently; within a receipt, logs fan out
//! concurrently; both fan-outs are joined before the block task completes.
//! A decoded `RequestForward` on one chain becomes an `execute` transaction
//! on the opposite chain, signed by the relayer's own key, and is recorded
//! in the audit store once mined.
//!
//! ## Security
//!
//! **CRITICAL**: This service holds the operator key and will execute any
//! request the bridge contract emits. Replay and signature validation are
//! the destination contract's responsibility, not this relay's.

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::bridge::{self, BridgeEvent, ForwardRequest};
use crate::chain::{Chain, ChainKind};
use crate::config::{Config, RelayerSettings};
use crate::crypto::RelaySigner;
use crate::evm_client::{build_signed_transaction, EvmBlockTransaction, EvmLog};
use crate::storage::{MessageStore, RelayedMessage};

/// Gas limit for execute transactions. Generous; unused gas is refunded.
pub const EXECUTE_GAS_LIMIT: u64 = 2_000_000;

/// Receipt poll interval while waiting for an execute transaction to mine.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

// ============================================================================
// RELAYER
// ============================================================================

/// The trusted relayer: two chain handles, one signing identity, one audit
/// store. Immutable after construction; shared across watcher tasks.
pub struct Relayer {
    home: Arc<Chain>,
    foreign: Arc<Chain>,
    signer: RelaySigner,
    relayer_address: String,
    store: MessageStore,
    settings: RelayerSettings,
}

impl Relayer {
    /// Builds a relayer from already-connected parts.
    pub fn new(
        home: Chain,
        foreign: Chain,
        signer: RelaySigner,
        store: MessageStore,
        settings: RelayerSettings,
    ) -> Result<Self> {
        let relayer_address = signer.ethereum_address()?;
        Ok(Self {
            home: Arc::new(home),
            foreign: Arc::new(foreign),
            signer,
            relayer_address,
            store,
            settings,
        })
    }

    /// Connects both chains and builds the relayer from configuration.
    ///
    /// Chain connection failures are fatal and propagate to the caller.
    pub async fn connect(config: &Config) -> Result<Self> {
        let signer = RelaySigner::from_hex(&config.relayer.get_private_key()?)
            .context("Failed to load relayer signing key")?;

        let home = Chain::connect(&config.home_chain, ChainKind::Home).await?;
        let foreign = Chain::connect(&config.foreign_chain, ChainKind::Foreign).await?;

        let relayer = Self::new(
            home,
            foreign,
            signer,
            MessageStore::new(&config.storage.path),
            config.relayer.clone(),
        )?;

        info!("Relayer signing address: {}", relayer.relayer_address);
        Ok(relayer)
    }

    /// The relayer's own Ethereum address (gas payer on both chains).
    pub fn address(&self) -> &str {
        &self.relayer_address
    }

    /// The home chain handle.
    pub fn home(&self) -> &Chain {
        &self.home
    }

    /// The foreign chain handle.
    pub fn foreign(&self) -> &Chain {
        &self.foreign
    }

    /// Starts both watchers and runs until the process is terminated.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        info!(
            "Starting trusted relayer: {} <-> {}, polling_interval={}ms",
            self.home.name, self.foreign.name, self.settings.polling_interval_ms
        );

        let home_watcher = tokio::spawn(self.clone().watch_chain(self.home.clone()));
        let foreign_watcher = tokio::spawn(self.clone().watch_chain(self.foreign.clone()));

        let (home_result, foreign_result) =
            tokio::try_join!(home_watcher, foreign_watcher).context("Watcher task panicked")?;
        home_result?;
        foreign_result?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Block watching
    // ------------------------------------------------------------------

    /// Polls one chain for new block heights for the life of the process.
    ///
    /// Every height observed above the baseline is handed to block
    /// processing exactly once, as a spawned task holding a semaphore
    /// permit so no more than `max_blocks_in_flight` blocks are processed
    /// concurrently per chain. A height the poll skips over is still
    /// covered: the loop walks every height between polls. Poll errors are
    /// logged and the loop continues.
    async fn watch_chain(self: Arc<Self>, chain: Arc<Chain>) -> Result<()> {
        let interval = Duration::from_millis(self.settings.polling_interval_ms);
        let permits = Arc::new(Semaphore::new(self.settings.max_blocks_in_flight));
        let mut last_seen: Option<u64> = None;

        info!("{}: watching for new blocks", chain.name);

        loop {
            match chain.client.block_number().await {
                Ok(current) => {
                    let baseline = match last_seen {
                        Some(height) => height,
                        None => {
                            // First successful poll establishes the baseline;
                            // earlier blocks are never examined.
                            debug!("{}: baseline height {}", chain.name, current);
                            last_seen = Some(current);
                            current
                        }
                    };

                    for height in (baseline + 1)..=current {
                        let permit = permits
                            .clone()
                            .acquire_owned()
                            .await
                            .context("Block watcher semaphore closed")?;
                        let relayer = self.clone();
                        let chain = chain.clone();
                        tokio::spawn(async move {
                            let _permit = permit;
                            if let Err(e) = relayer.process_block(height, &chain).await {
                                error!("{}: error processing block {}: {:#}", chain.name, height, e);
                            }
                        });
                    }
                    last_seen = Some(current);
                }
                Err(e) => {
                    error!("{}: error polling block number: {:#}", chain.name, e);
                }
            }

            tokio::time::sleep(interval).await;
        }
    }

    // ------------------------------------------------------------------
    // Block processing
    // ------------------------------------------------------------------

    /// Processes a single block: filters transactions addressed to the
    /// watched contracts and scans their receipts. All matching
    /// transactions are processed concurrently and joined before this
    /// returns.
    pub async fn process_block(&self, block_number: u64, chain: &Chain) -> Result<()> {
        let Some(block) = chain
            .client
            .get_block_with_transactions(block_number)
            .await?
        else {
            warn!("{}: block {} not found, skipping", chain.name, block_number);
            return Ok(());
        };

        info!(
            "{}: processing block {}, txn count: {}",
            chain.name,
            block_number,
            block.transactions.len()
        );

        let candidates: Vec<&EvmBlockTransaction> = block
            .transactions
            .iter()
            .filter(|tx| match tx.to.as_deref() {
                // Contract creations carry no destination and never match
                None => false,
                Some(to) => chain.watches_address(to),
            })
            .collect();

        let results = futures::future::join_all(
            candidates
                .iter()
                .map(|tx| self.process_transaction(tx, chain)),
        )
        .await;

        for result in results {
            result?;
        }
        Ok(())
    }

    /// Fetches one candidate transaction's receipt and fans its logs out to
    /// the decoder. Logs within the receipt are processed concurrently with
    /// no ordering guarantee, but all are joined here.
    async fn process_transaction(&self, tx: &EvmBlockTransaction, chain: &Chain) -> Result<()> {
        debug!(
            "{}: found txn that matters: hash={}, to={:?}",
            chain.name, tx.hash, tx.to
        );

        let Some(receipt) = chain.client.get_transaction_receipt(&tx.hash).await? else {
            warn!("{}: no receipt for transaction {}", chain.name, tx.hash);
            return Ok(());
        };

        if receipt.logs.is_empty() {
            return Ok(());
        }

        info!(
            "{}: found {} logs in transaction {}",
            chain.name,
            receipt.logs.len(),
            tx.hash
        );

        let results = futures::future::join_all(
            receipt.logs.iter().map(|log| self.process_log(log, chain)),
        )
        .await;

        for result in results {
            result?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Log processing
    // ------------------------------------------------------------------

    /// Decodes one log against the bridge event interface.
    ///
    /// Logs not emitted by the bridge contract, and logs that fail to
    /// decode, are skipped silently. A `RequestForward` triggers a relay to
    /// the opposite chain; a `RequestSucceeded` is only logged.
    pub async fn process_log(&self, log: &EvmLog, chain: &Chain) -> Result<()> {
        if !chain.is_bridge_log(&log.address) {
            return Ok(());
        }

        match bridge::parse_bridge_log(log) {
            Some(BridgeEvent::RequestForward(request)) => {
                info!(
                    "{}: RequestForward observed: from={}, to={}, value={}, nonce={}",
                    chain.name, request.from, request.to, request.value, request.nonce
                );
                self.relay_request(&request, chain).await
            }
            Some(BridgeEvent::RequestSucceeded(request)) => {
                info!(
                    "{}: RequestSucceeded observed: from={}, to={}, nonce={}",
                    chain.name, request.from, request.to, request.nonce
                );
                Ok(())
            }
            None => {
                debug!("{}: unrecognized bridge log, skipping", chain.name);
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Relay dispatch
    // ------------------------------------------------------------------

    /// Relays a forward request to the chain opposite its origin.
    ///
    /// Submits `execute` with the identical request tuple, waits without
    /// bound for mining confirmation, then appends the audit record.
    /// Confirmation is the single commit point: no record is written when
    /// submission fails or the transaction reverts.
    pub async fn relay_request(&self, request: &ForwardRequest, origin: &Chain) -> Result<()> {
        let destination = self.opposite_of(origin);
        let calldata = bridge::encode_execute(request)?;

        let tx_hash = self.submit_execute(destination, &calldata).await?;
        info!(
            "Waiting for relayed msg to mine on {} network: {}",
            destination.kind.network_name(),
            tx_hash
        );

        self.wait_for_confirmation(destination, &tx_hash).await?;
        info!(
            "Relayed msg mined on {} network: {}",
            destination.kind.network_name(),
            tx_hash
        );

        self.store
            .append(&RelayedMessage {
                from_address: request.from.clone(),
                to_address: request.to.clone(),
                value: request.value.clone(),
                data: request.data.clone(),
                signature: request.signature.clone(),
                source_network: origin.kind.network_name().to_string(),
                target_network: destination.kind.network_name().to_string(),
                relayed_at: Utc::now(),
            })
            .await
            .context("Failed to append audit record")?;

        info!("Finished writing audit record");
        Ok(())
    }

    /// Maps an origin chain to the destination handle. The pair has exactly
    /// two members, so origin uniquely determines destination.
    fn opposite_of(&self, origin: &Chain) -> &Chain {
        match origin.kind.opposite() {
            ChainKind::Home => &self.home,
            ChainKind::Foreign => &self.foreign,
        }
    }

    /// Submits an execute transaction, retrying transient failures with a
    /// fixed backoff. Exhausted attempts propagate the last error.
    async fn submit_execute(&self, chain: &Chain, calldata: &str) -> Result<String> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.try_submit(chain, calldata).await {
                Ok(tx_hash) => return Ok(tx_hash),
                Err(e) if attempt < self.settings.submit_attempts => {
                    warn!(
                        "{}: execute submission attempt {}/{} failed, retrying: {:#}",
                        chain.name, attempt, self.settings.submit_attempts, e
                    );
                    tokio::time::sleep(Duration::from_millis(self.settings.submit_backoff_ms))
                        .await;
                }
                Err(e) => {
                    return Err(e.context(format!(
                        "Execute submission failed after {} attempts on {}",
                        attempt, chain.name
                    )))
                }
            }
        }
    }

    /// One submission attempt. The chain's submit lock serializes nonce
    /// acquisition and broadcast, so concurrent dispatches to the same
    /// destination cannot race on the shared signer nonce.
    async fn try_submit(&self, chain: &Chain, calldata: &str) -> Result<String> {
        let _guard = chain.submit_lock.lock().await;

        let nonce = chain.client.transaction_count(&self.relayer_address).await?;
        let gas_price = chain.client.gas_price().await?;

        let raw_tx = build_signed_transaction(
            &self.signer,
            chain.chain_id,
            nonce,
            gas_price,
            EXECUTE_GAS_LIMIT,
            &chain.bridge_addr,
            calldata,
        )?;

        debug!(
            "{}: submitting execute: nonce={}, gas_price={}",
            chain.name, nonce, gas_price
        );

        chain.client.send_raw_transaction(&raw_tx).await
    }

    /// Polls for the transaction receipt until it appears. There is no
    /// upper bound: a provider that never resolves the receipt stalls this
    /// task without affecting other in-flight work. A receipt with any
    /// status other than 0x1 is a revert and fails the relay.
    async fn wait_for_confirmation(&self, chain: &Chain, tx_hash: &str) -> Result<()> {
        loop {
            if let Some(receipt) = chain.client.get_transaction_receipt(tx_hash).await? {
                let status = receipt.status.as_deref().unwrap_or("0x0");
                if status == "0x1" {
                    return Ok(());
                }
                anyhow::bail!(
                    "Execute transaction {} reverted on {} with status {}",
                    tx_hash,
                    chain.name,
                    status
                );
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }
}
