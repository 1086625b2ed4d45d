//! # numa-chain
//!
//! External-backed adapters for the sync engine: an Ethereum-style
//! JSON-RPC chain reader, a native ABI payload decoder, and an IPFS
//! HTTP-API content fetcher.  Each implements the matching trait from
//! `numa-shared`, so the engine never depends on this crate directly.

pub mod abi;
pub mod ipfs;
pub mod rpc;

pub use abi::AbiDecoder;
pub use ipfs::IpfsClient;
pub use rpc::JsonRpcClient;
