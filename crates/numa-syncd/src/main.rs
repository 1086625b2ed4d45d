//! # numa-syncd
//!
//! Polling daemon that keeps the local domain model in sync with the
//! social contract's on-chain activity:
//! - **JSON-RPC chain reader** for tip height and block contents
//! - **Native ABI decoder** extracting content addresses from call input
//! - **IPFS content fetcher** resolving activity documents
//! - **SQLite store** for accounts, messages, follows, favorites,
//!   batches, and the block checkpoint
//!
//! One sweep runs per poll interval; ctrl-c interrupts between blocks
//! and never leaves a premature checkpoint behind.

mod config;

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use numa_chain::{AbiDecoder, IpfsClient, JsonRpcClient};
use numa_store::Database;
use numa_sync::{SqliteCheckpoint, SyncConfig, SyncEngine, SyncError, TracingSink};

use crate::config::SyncdConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,numa_syncd=debug")),
        )
        .init();

    info!("Starting Numa sync daemon v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = SyncdConfig::from_env()?;
    info!(
        contract = %config.contract_address,
        rpc = %config.rpc_url,
        ipfs = %config.ipfs_api_url,
        poll_interval_secs = config.poll_interval_secs,
        "Loaded configuration"
    );

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------
    let db = Arc::new(match &config.db_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    });

    let chain = JsonRpcClient::new(config.rpc_url.clone());
    let decoder = if config.selectors.is_empty() {
        AbiDecoder::new()
    } else {
        AbiDecoder::with_selectors(config.selectors.clone())
    };
    let fetcher = IpfsClient::new(config.ipfs_api_url.clone());
    let checkpoint = SqliteCheckpoint::new(db.clone());

    let mut sync_config = SyncConfig::new(config.contract_address);
    sync_config.start_height = config.start_block;

    // -----------------------------------------------------------------------
    // 4. Graceful shutdown: interrupt between blocks, never mid-block.
    // -----------------------------------------------------------------------
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            let _ = shutdown_tx.send(true);
        }
    });

    let mut engine = SyncEngine::new(
        db,
        chain,
        decoder,
        fetcher,
        checkpoint,
        TracingSink,
        sync_config,
    )
    .with_shutdown(shutdown_rx.clone());

    // -----------------------------------------------------------------------
    // 5. Poll loop
    // -----------------------------------------------------------------------
    let interval = Duration::from_secs(config.poll_interval_secs);
    let mut shutdown = shutdown_rx;

    loop {
        match engine.run().await {
            Ok(report) => {
                info!(
                    processed = report.processed,
                    skipped = report.skipped,
                    failed = report.failed,
                    checkpoint = report.checkpoint,
                    "sweep complete"
                );
                if report.interrupted {
                    break;
                }
            }
            Err(SyncError::Aborted { height, source }) => {
                // Transport trouble; the checkpoint was not advanced, so
                // the next sweep resumes at the same start height.
                warn!(height, error = %source, "sweep aborted, will retry");
            }
            Err(e) => {
                error!(error = %e, "sweep failed");
                return Err(e.into());
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!("Numa sync daemon stopped");
    Ok(())
}
