//! The sync engine: orchestrates chain reader, filter, decoder, content
//! fetcher, batch processor, and checkpoint over a block range.
//!
//! Error tiers (who aborts what):
//! - *Transport* (block fetch): aborts the remaining range; the
//!   checkpoint is not advanced and the next run resumes at the same
//!   start height.
//! - *Decode* / *content fetch*: per-transaction; reported to the sink
//!   and skipped.
//! - *Application* (batch processing): reported and swallowed in normal
//!   operation so the sweep completes with best-effort progress, or
//!   propagated under [`FailureMode::Propagate`] so tests can observe
//!   the failure.  Invariant violations ([`StoreError::Conflict`]) are
//!   always propagated; they indicate a bug, not external-world noise.
//!
//! The checkpoint is only written after a complete sweep.  Partial
//! progress inside a failed sweep is recovered on the next run by the
//! confirmed-batch check on each transaction, not by partial checkpoint
//! writes.  Deliberate policy: a swallowed application failure does NOT
//! hold the checkpoint back, so that transaction is never retried
//! automatically.

use std::sync::Arc;

use numa_shared::{
    Address, Block, ChainError, ChainReader, CheckpointError, CheckpointStore, ContentFetcher,
    ErrorSink, PayloadDecoder, TxHash,
};
use numa_store::{Database, StoreError};
use thiserror::Error;
use tokio::sync::watch;

use crate::filter;
use crate::processor::BatchProcessor;

/// Hard failures of a sync run.  Everything softer is recorded in the
/// [`SyncReport`] and reported to the sink.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Transport-level failure mid-range; `height` is where we stopped.
    #[error("Range aborted at block #{height}: {source}")]
    Aborted {
        height: u64,
        #[source]
        source: ChainError,
    },

    /// Failure determining the range bounds.
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// Store failure outside batch processing (recording a transaction,
    /// deriving the start height).  The local database is broken or
    /// locked; nothing sensible to skip.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The durable cursor could not be written after a finished sweep.
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    /// Batch processing failure surfaced under
    /// [`FailureMode::Propagate`], or an invariant violation.
    #[error("Batch processing failed for {tx}: {source}")]
    Application {
        tx: TxHash,
        #[source]
        source: StoreError,
    },
}

/// What to do with an application-tier failure inside the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    /// Report, count as failed, continue the sweep.  Production default.
    #[default]
    Swallow,
    /// Propagate as [`SyncError::Application`].  For tests and
    /// verification runs that need to observe failures.
    Propagate,
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// The social contract whose transactions we index.
    pub contract_address: Address,
    /// Explicit resume height, overriding checkpoint and history.
    pub start_height: Option<u64>,
    pub failure_mode: FailureMode,
}

impl SyncConfig {
    pub fn new(contract_address: Address) -> Self {
        Self {
            contract_address,
            start_height: None,
            failure_mode: FailureMode::default(),
        }
    }
}

/// Observable engine lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    /// Sweeping; the height currently being processed.
    Ranging(u64),
    Done,
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// First height of the attempted range.
    pub start: u64,
    /// Chain tip at the start of the run.
    pub end: u64,
    /// Transactions fully applied this run.
    pub processed: usize,
    /// Transactions skipped because their batch was already confirmed.
    pub skipped: usize,
    /// Transactions that failed decode, fetch, or (swallowed) processing.
    pub failed: usize,
    /// Height persisted at the end of the sweep, if any.
    pub checkpoint: Option<u64>,
    /// True if the run was cancelled between blocks.
    pub interrupted: bool,
}

/// The orchestrator.  Single logical thread of control; one engine owns
/// its checkpoint and must be the only writer to it.
pub struct SyncEngine<C, D, F, K, S> {
    chain: C,
    decoder: D,
    fetcher: F,
    checkpoint: K,
    sink: S,
    db: Arc<Database>,
    processor: BatchProcessor,
    config: SyncConfig,
    state: EngineState,
    shutdown: Option<watch::Receiver<bool>>,
}

impl<C, D, F, K, S> SyncEngine<C, D, F, K, S>
where
    C: ChainReader,
    D: PayloadDecoder,
    F: ContentFetcher,
    K: CheckpointStore,
    S: ErrorSink,
{
    pub fn new(
        db: Arc<Database>,
        chain: C,
        decoder: D,
        fetcher: F,
        checkpoint: K,
        sink: S,
        config: SyncConfig,
    ) -> Self {
        let processor = BatchProcessor::new(db.clone());
        Self {
            chain,
            decoder,
            fetcher,
            checkpoint,
            sink,
            db,
            processor,
            config,
            state: EngineState::Idle,
            shutdown: None,
        }
    }

    /// Install a cancellation signal.  Checked between blocks only; an
    /// interrupted run never writes the checkpoint.
    pub fn with_shutdown(mut self, rx: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(rx);
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Sweep from the resume height to the current tip.
    pub async fn run(&mut self) -> Result<SyncReport, SyncError> {
        let start = self.resolve_start()?;
        let end = self.chain.tip_height().await?;

        let mut report = SyncReport {
            start,
            end,
            ..Default::default()
        };

        if start > end {
            tracing::info!(start, tip = end, "nothing to sync");
            self.state = EngineState::Done;
            return Ok(report);
        }

        tracing::info!(start, end, "starting range sweep");

        let mut completed = None;
        for height in start..=end {
            if self.stop_requested() {
                tracing::info!(height, "sync interrupted between blocks");
                report.interrupted = true;
                break;
            }
            self.state = EngineState::Ranging(height);

            let block = match self.chain.block_at(height).await {
                Ok(block) => block,
                Err(ChainError::BlockNotFound(_)) => {
                    // The tip moved under us (reorg or lagging node);
                    // stop early and checkpoint what finished.
                    tracing::warn!(height, "block not found, stopping range early");
                    break;
                }
                Err(source) => {
                    self.state = EngineState::Idle;
                    return Err(SyncError::Aborted { height, source });
                }
            };

            tracing::info!(height, txs = block.transactions.len(), "syncing block");
            self.sync_block(&block, &mut report).await?;
            completed = Some(height);
        }

        if !report.interrupted {
            if let Some(height) = completed {
                if self.should_checkpoint(height) {
                    self.checkpoint.write(height)?;
                    report.checkpoint = Some(height);
                }
            }
        }

        self.state = EngineState::Done;
        tracing::info!(
            processed = report.processed,
            skipped = report.skipped,
            failed = report.failed,
            checkpoint = report.checkpoint,
            "range sweep finished"
        );
        Ok(report)
    }

    /// Resume height: explicit override, then the checkpoint, then the
    /// highest block among transactions already recorded for the
    /// contract.  The checkpointed block itself is re-scanned; the
    /// confirmed-batch check makes that a cheap no-op.
    fn resolve_start(&self) -> Result<u64, SyncError> {
        if let Some(height) = self.config.start_height {
            return Ok(height);
        }

        match self.checkpoint.read() {
            Ok(Some(height)) => Ok(height),
            Ok(None) => self.derive_from_history(),
            Err(e) => {
                // A broken checkpoint must degrade, not crash the run.
                self.sink.report("reading checkpoint", &e);
                tracing::warn!(error = %e, "checkpoint unreadable, deriving start from history");
                self.derive_from_history()
            }
        }
    }

    /// The checkpoint never moves backwards.  An explicit start override
    /// can sweep a range behind the stored cursor; that sweep still runs
    /// (idempotently) but leaves the cursor where it was.
    fn should_checkpoint(&self, height: u64) -> bool {
        match self.checkpoint.read() {
            Ok(Some(current)) => height >= current,
            _ => true,
        }
    }

    fn derive_from_history(&self) -> Result<u64, SyncError> {
        Ok(self
            .db
            .max_block_for_recipient(&self.config.contract_address)?
            .unwrap_or(0))
    }

    async fn sync_block(&self, block: &Block, report: &mut SyncReport) -> Result<(), SyncError> {
        for tx in &block.transactions {
            if !filter::is_relevant(tx, &self.config.contract_address) {
                continue;
            }

            self.db.record_transaction(tx, block.number)?;
            if self.db.transaction_has_confirmed_batch(&tx.hash)? {
                report.skipped += 1;
                continue;
            }

            let address = match self.decoder.decode(&tx.input) {
                Ok(address) => address,
                Err(e) => {
                    self.sink
                        .report(&format!("decoding input of {}", tx.hash), &e);
                    tracing::warn!(tx = %tx.hash.short(), error = %e, "decode failed");
                    report.failed += 1;
                    continue;
                }
            };

            let doc = match self.fetcher.fetch(&address).await {
                Ok(doc) => doc,
                Err(e) => {
                    self.sink
                        .report(&format!("fetching content for {}", tx.hash), &e);
                    tracing::warn!(tx = %tx.hash.short(), error = %e, "content fetch failed");
                    report.failed += 1;
                    continue;
                }
            };

            match self.processor.process(tx, &doc) {
                Ok(()) => report.processed += 1,
                Err(source @ StoreError::Conflict(_)) => {
                    // Never swallowed: a conflicting association is a bug.
                    return Err(SyncError::Application {
                        tx: tx.hash,
                        source,
                    });
                }
                Err(source) => match self.config.failure_mode {
                    FailureMode::Propagate => {
                        return Err(SyncError::Application {
                            tx: tx.hash,
                            source,
                        });
                    }
                    FailureMode::Swallow => {
                        self.sink
                            .report(&format!("processing batch for {}", tx.hash), &source);
                        tracing::error!(tx = %tx.hash.short(), error = %source, "batch processing failed");
                        report.failed += 1;
                    }
                },
            }
        }
        Ok(())
    }

    fn stop_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .map(|rx| *rx.borrow())
            .unwrap_or(false)
    }
}
