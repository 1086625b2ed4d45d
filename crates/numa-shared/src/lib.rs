//! # numa-shared
//!
//! Types and boundary contracts shared by every Numa indexer crate:
//! chain addresses and blocks, content addresses, the parsed
//! activity-stream document model, and the adapter traits the sync
//! engine consumes.

pub mod activity;
pub mod traits;
pub mod types;

mod error;

pub use activity::{ActivityDocument, ActivityItem};
pub use error::{AddressError, ChainError, CheckpointError, DecodeError, FetchError};
pub use traits::{ChainReader, CheckpointStore, ContentFetcher, ErrorSink, PayloadDecoder};
pub use types::{Address, Block, ChainTransaction, ContentAddress, TxHash};
