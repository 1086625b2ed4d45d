//! Daemon configuration loaded from environment variables.
//!
//! Only the contract address is mandatory; everything else defaults to
//! a local development setup (local chain node, local IPFS node, the
//! platform data directory for the database).

use std::path::PathBuf;

use numa_shared::Address;

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct SyncdConfig {
    /// Address of the social contract to index.
    /// Env: `CONTRACT_ADDRESS` (required)
    pub contract_address: Address,

    /// JSON-RPC endpoint of the chain node.
    /// Env: `RPC_URL`
    /// Default: `http://127.0.0.1:8545`
    pub rpc_url: String,

    /// HTTP API root of the IPFS node.
    /// Env: `IPFS_API_URL`
    /// Default: `http://127.0.0.1:5001`
    pub ipfs_api_url: String,

    /// Explicit database path.  When unset, the platform data directory
    /// is used.
    /// Env: `DB_PATH`
    pub db_path: Option<PathBuf>,

    /// Seconds to sleep between range sweeps.
    /// Env: `POLL_INTERVAL_SECS`
    /// Default: `15`
    pub poll_interval_secs: u64,

    /// Resume from an explicit height instead of the checkpoint.
    /// Env: `START_BLOCK`
    pub start_block: Option<u64>,

    /// Accepted 4-byte function selectors, comma-separated hex.
    /// Empty accepts any selector.
    /// Env: `CONTRACT_SELECTORS` (e.g. `a1b2c3d4,deadbeef`)
    pub selectors: Vec<[u8; 4]>,
}

impl SyncdConfig {
    /// Load configuration from environment variables.
    ///
    /// A missing or malformed `CONTRACT_ADDRESS` is fatal; optional
    /// settings fall back to their defaults with a warning.
    pub fn from_env() -> anyhow::Result<Self> {
        let contract = std::env::var("CONTRACT_ADDRESS")
            .map_err(|_| anyhow::anyhow!("CONTRACT_ADDRESS is required"))?;
        let contract_address = contract
            .parse::<Address>()
            .map_err(|e| anyhow::anyhow!("invalid CONTRACT_ADDRESS {contract:?}: {e}"))?;

        let mut config = Self {
            contract_address,
            rpc_url: "http://127.0.0.1:8545".to_string(),
            ipfs_api_url: "http://127.0.0.1:5001".to_string(),
            db_path: None,
            poll_interval_secs: 15,
            start_block: None,
            selectors: Vec::new(),
        };

        if let Ok(url) = std::env::var("RPC_URL") {
            config.rpc_url = url;
        }

        if let Ok(url) = std::env::var("IPFS_API_URL") {
            config.ipfs_api_url = url;
        }

        if let Ok(path) = std::env::var("DB_PATH") {
            config.db_path = Some(PathBuf::from(path));
        }

        if let Ok(val) = std::env::var("POLL_INTERVAL_SECS") {
            if let Ok(secs) = val.parse::<u64>() {
                config.poll_interval_secs = secs;
            } else {
                tracing::warn!(value = %val, "Invalid POLL_INTERVAL_SECS, using default");
            }
        }

        if let Ok(val) = std::env::var("START_BLOCK") {
            if let Ok(height) = val.parse::<u64>() {
                config.start_block = Some(height);
            } else {
                tracing::warn!(value = %val, "Invalid START_BLOCK, ignoring");
            }
        }

        if let Ok(val) = std::env::var("CONTRACT_SELECTORS") {
            match parse_selectors(&val) {
                Ok(selectors) => config.selectors = selectors,
                Err(e) => {
                    tracing::warn!(error = %e, "Invalid CONTRACT_SELECTORS, accepting any selector");
                }
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        Ok(config)
    }
}

/// Parse a comma-separated list of 8-hex-char selectors.
fn parse_selectors(raw: &str) -> Result<Vec<[u8; 4]>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            let s = s.strip_prefix("0x").unwrap_or(s);
            let bytes = hex::decode(s).map_err(|e| format!("bad selector {s:?}: {e}"))?;
            let arr: [u8; 4] = bytes
                .try_into()
                .map_err(|_| format!("selector {s:?} is not 4 bytes"))?;
            Ok(arr)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_selector_lists() {
        let selectors = parse_selectors("a1b2c3d4, 0xdeadbeef").unwrap();
        assert_eq!(
            selectors,
            vec![[0xa1, 0xb2, 0xc3, 0xd4], [0xde, 0xad, 0xbe, 0xef]]
        );
    }

    #[test]
    fn empty_selector_list_is_ok() {
        assert!(parse_selectors("").unwrap().is_empty());
    }

    #[test]
    fn wrong_width_selector_is_rejected() {
        assert!(parse_selectors("abcd").is_err());
    }
}
