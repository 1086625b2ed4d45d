//! IPFS HTTP-API content fetcher.
//!
//! Resolves a content address via `POST /api/v0/cat` and parses the
//! bytes as an activity document.  The address is passed as a multibase
//! base16 CIDv1, which the API accepts without any base58 handling on
//! our side.

use numa_shared::{ActivityDocument, ContentAddress, ContentFetcher, FetchError};

/// Content fetcher backed by an IPFS node's HTTP API.
pub struct IpfsClient {
    http: reqwest::Client,
    api_url: String,
}

impl IpfsClient {
    /// `api_url` is the node's API root, e.g. `http://127.0.0.1:5001`.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into(),
        }
    }

    async fn cat(&self, address: &ContentAddress) -> Result<Vec<u8>, FetchError> {
        let url = format!(
            "{}/api/v0/cat?arg={}",
            self.api_url.trim_end_matches('/'),
            address.to_cid_hex()
        );

        let response = self
            .http
            .post(&url)
            .send()
            .await
            .map_err(|e| FetchError::Unavailable {
                address: *address,
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(FetchError::Unavailable {
                address: *address,
                reason: format!("HTTP {}", response.status()),
            });
        }

        let bytes = response.bytes().await.map_err(|e| FetchError::Unavailable {
            address: *address,
            reason: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }
}

impl ContentFetcher for IpfsClient {
    async fn fetch(&self, address: &ContentAddress) -> Result<ActivityDocument, FetchError> {
        let bytes = self.cat(address).await?;

        tracing::debug!(address = %address, size = bytes.len(), "fetched content");

        serde_json::from_slice(&bytes).map_err(|source| FetchError::Malformed {
            address: *address,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cid_rendering_matches_api_expectations() {
        let address = ContentAddress::sha2([0xab; 32]);
        let cid = address.to_cid_hex();
        // multibase 'f' + cid-version 01 + raw codec 55 + sha2 multihash.
        assert_eq!(cid, format!("f01551220{}", "ab".repeat(32)));
    }

    #[test]
    fn malformed_document_classification() {
        let address = ContentAddress::sha2([0x01; 32]);
        let err = serde_json::from_slice::<ActivityDocument>(b"not json").unwrap_err();
        let fetch_err = FetchError::Malformed {
            address,
            source: err,
        };
        assert!(fetch_err.to_string().contains("Malformed document"));
    }
}
