//! # numa-sync
//!
//! The sync engine: resumable iteration over the append-only block
//! sequence, transaction filtering, idempotent batch application, and
//! checkpoint management.
//!
//! The engine is generic over the adapter traits in `numa-shared`, so
//! the JSON-RPC / IPFS adapters from `numa-chain` and the in-memory
//! doubles in [`testing`] plug in interchangeably.

pub mod checkpoint;
pub mod engine;
pub mod filter;
pub mod processor;
pub mod sink;
pub mod testing;

pub use checkpoint::SqliteCheckpoint;
pub use engine::{EngineState, FailureMode, SyncConfig, SyncEngine, SyncError, SyncReport};
pub use processor::BatchProcessor;
pub use sink::TracingSink;
