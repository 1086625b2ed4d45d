//! Ethereum-style JSON-RPC chain reader.
//!
//! Uses `eth_blockNumber` for the tip and `eth_getBlockByNumber` (with
//! full transaction bodies) for block contents.  All transport and
//! protocol failures map to [`ChainError`]; a null block result maps to
//! [`ChainError::BlockNotFound`] so the engine can stop a range early
//! when it races the tip.

use bytes::Bytes;
use numa_shared::{Address, Block, ChainError, ChainReader, ChainTransaction, TxHash};
use serde::Deserialize;
use serde_json::json;

/// JSON-RPC client over HTTP.
pub struct JsonRpcClient {
    http: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Wire shape of a block with full transaction bodies.
#[derive(Debug, Deserialize)]
pub(crate) struct RpcBlock {
    pub number: String,
    #[serde(default)]
    pub transactions: Vec<RpcTransaction>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcTransaction {
    pub hash: String,
    pub from: String,
    pub to: Option<String>,
    pub input: String,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<Option<T>, ChainError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))?;

        let parsed: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| ChainError::Malformed(e.to_string()))?;

        if let Some(err) = parsed.error {
            return Err(ChainError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(parsed.result)
    }
}

impl ChainReader for JsonRpcClient {
    async fn tip_height(&self) -> Result<u64, ChainError> {
        let hex: String = self
            .call("eth_blockNumber", json!([]))
            .await?
            .ok_or_else(|| ChainError::Malformed("null eth_blockNumber result".into()))?;
        parse_quantity(&hex)
    }

    async fn block_at(&self, height: u64) -> Result<Block, ChainError> {
        let block: RpcBlock = self
            .call(
                "eth_getBlockByNumber",
                json!([format!("0x{height:x}"), true]),
            )
            .await?
            .ok_or(ChainError::BlockNotFound(height))?;

        block.try_into()
    }
}

impl TryFrom<RpcBlock> for Block {
    type Error = ChainError;

    fn try_from(block: RpcBlock) -> Result<Self, ChainError> {
        let number = parse_quantity(&block.number)?;
        let transactions = block
            .transactions
            .into_iter()
            .map(|tx| tx.try_into())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Block {
            number,
            transactions,
        })
    }
}

impl TryFrom<RpcTransaction> for ChainTransaction {
    type Error = ChainError;

    fn try_from(tx: RpcTransaction) -> Result<Self, ChainError> {
        let hash = TxHash::from_hex(&tx.hash)
            .map_err(|e| ChainError::Malformed(format!("bad tx hash {}: {e}", tx.hash)))?;
        let from = Address::from_hex(&tx.from)
            .map_err(|e| ChainError::Malformed(format!("bad from address: {e}")))?;
        let to = tx
            .to
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(Address::from_hex)
            .transpose()
            .map_err(|e| ChainError::Malformed(format!("bad to address: {e}")))?;

        let input_hex = tx.input.strip_prefix("0x").unwrap_or(&tx.input);
        let input = hex::decode(input_hex)
            .map_err(|e| ChainError::Malformed(format!("bad tx input: {e}")))?;

        Ok(ChainTransaction {
            hash,
            from,
            to,
            input: Bytes::from(input),
        })
    }
}

/// Parse a `0x`-prefixed hex quantity.
fn parse_quantity(hex: &str) -> Result<u64, ChainError> {
    let digits = hex.strip_prefix("0x").unwrap_or(hex);
    u64::from_str_radix(digits, 16)
        .map_err(|e| ChainError::Malformed(format!("bad hex quantity {hex}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quantities() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x4b7").unwrap(), 1207);
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn converts_wire_block() {
        let json = serde_json::json!({
            "number": "0x10",
            "transactions": [{
                "hash": format!("0x{}", "ab".repeat(32)),
                "from": format!("0x{}", "11".repeat(20)),
                "to": format!("0x{}", "22".repeat(20)),
                "input": "0xdeadbeef"
            }]
        });
        let wire: RpcBlock = serde_json::from_value(json).unwrap();
        let block: Block = wire.try_into().unwrap();

        assert_eq!(block.number, 16);
        assert_eq!(block.transactions.len(), 1);
        let tx = &block.transactions[0];
        assert_eq!(tx.input.as_ref(), &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(tx.to.unwrap().to_hex(), format!("0x{}", "22".repeat(20)));
    }

    #[test]
    fn contract_creation_has_no_recipient() {
        let json = serde_json::json!({
            "number": "0x1",
            "transactions": [{
                "hash": format!("0x{}", "ab".repeat(32)),
                "from": format!("0x{}", "11".repeat(20)),
                "to": null,
                "input": "0x"
            }]
        });
        let wire: RpcBlock = serde_json::from_value(json).unwrap();
        let block: Block = wire.try_into().unwrap();
        assert!(block.transactions[0].to.is_none());
        assert!(block.transactions[0].input.is_empty());
    }

    #[test]
    fn block_without_transactions_field() {
        let wire: RpcBlock = serde_json::from_value(serde_json::json!({ "number": "0x2" })).unwrap();
        let block: Block = wire.try_into().unwrap();
        assert!(block.transactions.is_empty());
    }
}
