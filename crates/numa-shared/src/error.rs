use thiserror::Error;

use crate::types::ContentAddress;

/// Failure parsing a hex-encoded address or hash.
#[derive(Error, Debug)]
pub enum AddressError {
    #[error("Hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("Wrong byte length: {0}")]
    BadLength(usize),
}

/// Errors crossing the chain-reader boundary.
///
/// `Transport` is fatal to the current range sweep; `BlockNotFound` is a
/// tip race the caller tolerates by stopping the range early.
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Chain unavailable: {0}")]
    Transport(String),

    #[error("Block #{0} not found")]
    BlockNotFound(u64),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Malformed chain response: {0}")]
    Malformed(String),
}

/// Errors decoding a transaction's call input into a content address.
/// Always per-transaction: reported and skipped, never fatal to a sweep.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Empty call input")]
    Empty,

    #[error("Call input too short: {0} bytes")]
    TooShort(usize),

    #[error("Unknown function selector: 0x{}", hex::encode(.0))]
    UnknownSelector([u8; 4]),
}

/// Errors resolving a content address to an activity document.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Content unavailable at {address}: {reason}")]
    Unavailable {
        address: ContentAddress,
        reason: String,
    },

    #[error("Malformed document at {address}: {source}")]
    Malformed {
        address: ContentAddress,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors reading or writing the durable checkpoint slot.
#[derive(Error, Debug)]
#[error("Checkpoint store error: {0}")]
pub struct CheckpointError(pub String);
