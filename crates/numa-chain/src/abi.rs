//! Native ABI payload decoder.
//!
//! The contract's publish methods all take a single `bytes32` argument:
//! the sha2-256 digest of the activity document in the content store.
//! Call input is therefore a 4-byte function selector followed by one
//! 32-byte word (plus any ABI padding for methods with trailing
//! arguments we ignore).
//!
//! Any other implementation of `PayloadDecoder` (e.g. one backed by a
//! full ABI library) can be swapped in without touching the engine.

use numa_shared::{ContentAddress, DecodeError, PayloadDecoder};

const SELECTOR_LEN: usize = 4;
const WORD_LEN: usize = 32;

/// Decodes `selector ++ bytes32` call input into a content address.
#[derive(Debug, Clone, Default)]
pub struct AbiDecoder {
    /// Accepted function selectors.  Empty means accept any selector,
    /// which matches contracts whose every method publishes a digest.
    selectors: Vec<[u8; 4]>,
}

impl AbiDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict decoding to a known set of selectors; anything else is a
    /// per-transaction [`DecodeError::UnknownSelector`].
    pub fn with_selectors(selectors: Vec<[u8; 4]>) -> Self {
        Self { selectors }
    }
}

impl PayloadDecoder for AbiDecoder {
    fn decode(&self, input: &[u8]) -> Result<ContentAddress, DecodeError> {
        if input.is_empty() {
            return Err(DecodeError::Empty);
        }
        if input.len() < SELECTOR_LEN + WORD_LEN {
            return Err(DecodeError::TooShort(input.len()));
        }

        let mut selector = [0u8; 4];
        selector.copy_from_slice(&input[..SELECTOR_LEN]);
        if !self.selectors.is_empty() && !self.selectors.contains(&selector) {
            return Err(DecodeError::UnknownSelector(selector));
        }

        let mut digest = [0u8; 32];
        digest.copy_from_slice(&input[SELECTOR_LEN..SELECTOR_LEN + WORD_LEN]);
        Ok(ContentAddress::sha2(digest))
    }
}
