use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AddressError;

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte on-chain account or contract address.
///
/// Parsing normalizes case, so two addresses that differ only in hex
/// casing compare equal.  Displayed (and serialized) as lower-case
/// `0x`-prefixed hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address(pub [u8; 20]);

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl Address {
    pub fn from_hex(s: &str) -> Result<Self, AddressError> {
        let s = s.trim().strip_prefix("0x").unwrap_or(s.trim());
        let bytes = hex::decode(s)?;
        if bytes.len() != 20 {
            return Err(AddressError::BadLength(bytes.len()));
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::str::FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

// ---------------------------------------------------------------------------
// TxHash
// ---------------------------------------------------------------------------

/// A 32-byte transaction hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash(pub [u8; 32]);

impl Serialize for TxHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl TxHash {
    pub fn from_hex(s: &str) -> Result<Self, AddressError> {
        let s = s.trim().strip_prefix("0x").unwrap_or(s.trim());
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(AddressError::BadLength(bytes.len()));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn short(&self) -> String {
        self.to_hex()[..10].to_string()
    }
}

impl std::fmt::Display for TxHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// ContentAddress
// ---------------------------------------------------------------------------

/// Multihash codes for the digests we produce or decode.
pub const MULTIHASH_SHA2_256: u64 = 0x12;
pub const MULTIHASH_BLAKE3: u64 = 0x1e;

/// A content address: a multihash (code + size + 32-byte digest)
/// identifying an immutable document in the content-addressed store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ContentAddress {
    /// Multihash function code (0x12 = sha2-256, 0x1e = blake3).
    pub code: u64,
    /// Digest length in bytes.  Always 32 for the hashes we handle.
    pub size: u8,
    /// The digest itself.
    pub digest: [u8; 32],
}

impl ContentAddress {
    /// Wrap a sha2-256 digest extracted from an on-chain payload.
    pub fn sha2(digest: [u8; 32]) -> Self {
        Self {
            code: MULTIHASH_SHA2_256,
            size: 32,
            digest,
        }
    }

    /// Hash arbitrary bytes with blake3.  Used by local/in-memory content
    /// stores; the chain-side decoder always produces sha2 addresses.
    pub fn blake3_of(data: &[u8]) -> Self {
        Self {
            code: MULTIHASH_BLAKE3,
            size: 32,
            digest: *blake3::hash(data).as_bytes(),
        }
    }

    /// Render as hex multihash, e.g. `1220ab...` for sha2-256.
    pub fn to_multihash_hex(&self) -> String {
        format!("{:02x}{:02x}{}", self.code, self.size, hex::encode(self.digest))
    }

    /// Render as a multibase base16 CIDv1 (raw codec), accepted by IPFS
    /// HTTP APIs without needing a base58 encoder.
    pub fn to_cid_hex(&self) -> String {
        format!("f0155{}", self.to_multihash_hex())
    }
}

impl std::fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_multihash_hex())
    }
}

// ---------------------------------------------------------------------------
// Block / ChainTransaction
// ---------------------------------------------------------------------------

/// A single transaction as read from the chain.  Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainTransaction {
    pub hash: TxHash,
    pub from: Address,
    /// Absent for contract-creation transactions.
    pub to: Option<Address>,
    /// Raw call input.
    pub input: Bytes,
}

/// A block: height plus its ordered transaction list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub number: u64,
    pub transactions: Vec<ChainTransaction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_parse_is_case_insensitive() {
        let a = Address::from_hex("0xAbCdEf0123456789abcdef0123456789ABCDEF01").unwrap();
        let b = Address::from_hex("0xabcdef0123456789abcdef0123456789abcdef01").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_hex(), "0xabcdef0123456789abcdef0123456789abcdef01");
    }

    #[test]
    fn address_rejects_wrong_length() {
        assert!(matches!(
            Address::from_hex("0xabcd"),
            Err(AddressError::BadLength(2))
        ));
    }

    #[test]
    fn tx_hash_round_trip() {
        let hex = format!("0x{}", "ab".repeat(32));
        let h = TxHash::from_hex(&hex).unwrap();
        assert_eq!(h.to_hex(), hex);
        assert_eq!(h.short(), "0xabababab");
    }

    #[test]
    fn content_address_rendering() {
        let addr = ContentAddress::sha2([0x11; 32]);
        assert!(addr.to_multihash_hex().starts_with("1220"));
        assert!(addr.to_cid_hex().starts_with("f01551220"));
    }

    #[test]
    fn blake3_addresses_are_deterministic() {
        let a = ContentAddress::blake3_of(b"hello");
        let b = ContentAddress::blake3_of(b"hello");
        assert_eq!(a, b);
        assert_eq!(a.code, MULTIHASH_BLAKE3);
    }
}
