//! In-memory adapter doubles for the integration suite and for dry
//! runs against fixture data.  Nothing here touches the network.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use bytes::Bytes;
use numa_shared::{
    ActivityDocument, Address, Block, ChainError, ChainReader, ChainTransaction,
    CheckpointError, CheckpointStore, ContentAddress, ContentFetcher, DecodeError, ErrorSink,
    FetchError, PayloadDecoder, TxHash,
};

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// An in-memory chain.  Heights without an explicit block read as empty
/// blocks up to the tip; past the tip they are `BlockNotFound`.
#[derive(Default)]
pub struct MemoryChain {
    blocks: Mutex<BTreeMap<u64, Block>>,
    tip: Mutex<u64>,
    fail_at: Mutex<Option<u64>>,
    missing_at: Mutex<Option<u64>>,
}

impl MemoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a block and raise the tip to cover it.
    pub fn push_block(&self, block: Block) {
        let mut tip = self.tip.lock().unwrap();
        *tip = (*tip).max(block.number);
        self.blocks.lock().unwrap().insert(block.number, block);
    }

    pub fn set_tip(&self, height: u64) {
        *self.tip.lock().unwrap() = height;
    }

    /// Make `block_at(height)` fail with a transport error.
    pub fn fail_transport_at(&self, height: Option<u64>) {
        *self.fail_at.lock().unwrap() = height;
    }

    /// Make `block_at(height)` report the block missing even though it is
    /// at or below the tip, simulating a node whose tip answer raced a
    /// reorg or lagging peer.
    pub fn missing_block_at(&self, height: Option<u64>) {
        *self.missing_at.lock().unwrap() = height;
    }
}

impl ChainReader for MemoryChain {
    async fn tip_height(&self) -> Result<u64, ChainError> {
        Ok(*self.tip.lock().unwrap())
    }

    async fn block_at(&self, height: u64) -> Result<Block, ChainError> {
        if *self.fail_at.lock().unwrap() == Some(height) {
            return Err(ChainError::Transport("injected transport failure".into()));
        }
        if *self.missing_at.lock().unwrap() == Some(height) {
            return Err(ChainError::BlockNotFound(height));
        }
        if height > *self.tip.lock().unwrap() {
            return Err(ChainError::BlockNotFound(height));
        }
        Ok(self
            .blocks
            .lock()
            .unwrap()
            .get(&height)
            .cloned()
            .unwrap_or(Block {
                number: height,
                transactions: Vec::new(),
            }))
    }
}

// ---------------------------------------------------------------------------
// Content store
// ---------------------------------------------------------------------------

/// Content-addressed store keyed by digest, so documents stored under a
/// blake3 address are still found when the decoder hands back a sha2
/// address carrying the same digest.
#[derive(Default)]
pub struct MemoryContentStore {
    docs: Mutex<HashMap<[u8; 32], ActivityDocument>>,
    unavailable: Mutex<HashSet<[u8; 32]>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a document, returning its content address.
    pub fn store(&self, doc: &ActivityDocument) -> ContentAddress {
        let bytes = serde_json::to_vec(doc).expect("document serializes");
        let address = ContentAddress::blake3_of(&bytes);
        self.docs.lock().unwrap().insert(address.digest, doc.clone());
        address
    }

    /// Make fetches of `address` fail with `ContentUnavailable`.
    pub fn make_unavailable(&self, address: &ContentAddress) {
        self.unavailable.lock().unwrap().insert(address.digest);
    }
}

impl ContentFetcher for MemoryContentStore {
    async fn fetch(&self, address: &ContentAddress) -> Result<ActivityDocument, FetchError> {
        if self.unavailable.lock().unwrap().contains(&address.digest) {
            return Err(FetchError::Unavailable {
                address: *address,
                reason: "injected unavailability".into(),
            });
        }
        self.docs
            .lock()
            .unwrap()
            .get(&address.digest)
            .cloned()
            .ok_or(FetchError::Unavailable {
                address: *address,
                reason: "not stored".into(),
            })
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Wraps a decoder and counts invocations, for at-most-once assertions.
pub struct CountingDecoder<D> {
    inner: D,
    calls: AtomicUsize,
}

impl<D> CountingDecoder<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<D: PayloadDecoder> PayloadDecoder for CountingDecoder<D> {
    fn decode(&self, input: &[u8]) -> Result<ContentAddress, DecodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.decode(input)
    }
}

/// Decodes `selector ++ digest` input the same way the production ABI
/// decoder does, without depending on it.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordDecoder;

impl PayloadDecoder for WordDecoder {
    fn decode(&self, input: &[u8]) -> Result<ContentAddress, DecodeError> {
        if input.is_empty() {
            return Err(DecodeError::Empty);
        }
        if input.len() < 36 {
            return Err(DecodeError::TooShort(input.len()));
        }
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&input[4..36]);
        Ok(ContentAddress::sha2(digest))
    }
}

// ---------------------------------------------------------------------------
// Checkpoint
// ---------------------------------------------------------------------------

/// Volatile checkpoint with injectable read failures.
#[derive(Default)]
pub struct MemoryCheckpoint {
    value: Mutex<Option<u64>>,
    fail_reads: AtomicBool,
}

impl MemoryCheckpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }
}

impl CheckpointStore for MemoryCheckpoint {
    fn read(&self) -> Result<Option<u64>, CheckpointError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CheckpointError("injected read failure".into()));
        }
        Ok(*self.value.lock().unwrap())
    }

    fn write(&self, height: u64) -> Result<(), CheckpointError> {
        *self.value.lock().unwrap() = Some(height);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Error sink
// ---------------------------------------------------------------------------

/// Collects reports so tests can assert on them.
#[derive(Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<String> {
        self.reports.lock().unwrap().clone()
    }
}

impl ErrorSink for RecordingSink {
    fn report(&self, context: &str, error: &dyn std::fmt::Display) {
        self.reports
            .lock()
            .unwrap()
            .push(format!("{context}: {error}"));
    }
}

// ---------------------------------------------------------------------------
// Fixture helpers
// ---------------------------------------------------------------------------

/// Build a transaction whose input publishes `address`.
pub fn publish_tx(
    hash_byte: u8,
    from: Address,
    to: Address,
    address: &ContentAddress,
) -> ChainTransaction {
    let mut input = vec![0xde, 0xad, 0xbe, 0xef];
    input.extend_from_slice(&address.digest);
    ChainTransaction {
        hash: TxHash([hash_byte; 32]),
        from,
        to: Some(to),
        input: Bytes::from(input),
    }
}

/// Build a transaction with garbage input that fails decoding.
pub fn garbage_tx(hash_byte: u8, from: Address, to: Address) -> ChainTransaction {
    ChainTransaction {
        hash: TxHash([hash_byte; 32]),
        from,
        to: Some(to),
        input: Bytes::from_static(b"\x01\x02\x03"),
    }
}
