//! Adapter contracts consumed by the sync engine.
//!
//! Each trait wraps one external collaborator (chain node, ABI decoder,
//! content store, checkpoint slot, telemetry sink).  The engine is
//! generic over all of them, so production adapters and in-memory test
//! doubles plug in interchangeably.

use crate::activity::ActivityDocument;
use crate::error::{ChainError, CheckpointError, DecodeError, FetchError};
use crate::types::{Block, ContentAddress};

/// Read-only view of the chain: current tip and block contents.
#[allow(async_fn_in_trait)]
pub trait ChainReader {
    /// Height of the newest block the node knows about.
    async fn tip_height(&self) -> Result<u64, ChainError>;

    /// Fetch a block with full transaction bodies.
    ///
    /// Returns [`ChainError::BlockNotFound`] if `height` is past the tip
    /// at fetch time; callers stop the range early rather than erroring.
    async fn block_at(&self, height: u64) -> Result<Block, ChainError>;
}

/// Turns raw call input into the content address it carries.
pub trait PayloadDecoder {
    fn decode(&self, input: &[u8]) -> Result<ContentAddress, DecodeError>;
}

/// Resolves a content address to a parsed activity document.
#[allow(async_fn_in_trait)]
pub trait ContentFetcher {
    async fn fetch(&self, address: &ContentAddress) -> Result<ActivityDocument, FetchError>;
}

/// Durable cursor holding the last fully-synced block height.
///
/// The engine is the sole writer; a read failure must degrade to the
/// history-derived start height, never crash the run.
pub trait CheckpointStore {
    fn read(&self) -> Result<Option<u64>, CheckpointError>;
    fn write(&self, height: u64) -> Result<(), CheckpointError>;
}

/// Fire-and-forget error reporting.  Implementations must never fail.
pub trait ErrorSink {
    fn report(&self, context: &str, error: &dyn std::fmt::Display);
}

// Shared references delegate, so a caller can hand the engine a borrow
// of an adapter and keep the original for inspection.

impl<T: ChainReader> ChainReader for &T {
    async fn tip_height(&self) -> Result<u64, ChainError> {
        (**self).tip_height().await
    }

    async fn block_at(&self, height: u64) -> Result<Block, ChainError> {
        (**self).block_at(height).await
    }
}

impl<T: PayloadDecoder> PayloadDecoder for &T {
    fn decode(&self, input: &[u8]) -> Result<ContentAddress, DecodeError> {
        (**self).decode(input)
    }
}

impl<T: ContentFetcher> ContentFetcher for &T {
    async fn fetch(&self, address: &ContentAddress) -> Result<ActivityDocument, FetchError> {
        (**self).fetch(address).await
    }
}

impl<T: CheckpointStore> CheckpointStore for &T {
    fn read(&self) -> Result<Option<u64>, CheckpointError> {
        (**self).read()
    }

    fn write(&self, height: u64) -> Result<(), CheckpointError> {
        (**self).write(height)
    }
}

impl<T: ErrorSink> ErrorSink for &T {
    fn report(&self, context: &str, error: &dyn std::fmt::Display) {
        (**self).report(context, error)
    }
}
