//! On-chain transaction records.
//!
//! The `batch_id` column is the transaction's "transactable": the batch
//! it produced.  It is established at most once; a transaction whose
//! batch is already confirmed marks the idempotence boundary -- the sync
//! engine never decodes or refetches it again.

use chrono::Utc;
use numa_shared::{Address, ChainTransaction, TxHash};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::messages::{parse_timestamp, parse_uuid};
use crate::models::TxRecord;

impl Database {
    /// Record a transaction observed on chain.  Idempotent: re-recording
    /// the same hash leaves the existing row (and its batch link) alone.
    pub fn record_transaction(&self, tx: &ChainTransaction, block_number: u64) -> Result<TxRecord> {
        self.conn().execute(
            "INSERT OR IGNORE INTO transactions
                 (hash, block_number, from_address, to_address, input, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                tx.hash.to_hex(),
                block_number,
                tx.from.to_hex(),
                tx.to.map(|a| a.to_hex()),
                tx.input.as_ref(),
                Utc::now().to_rfc3339(),
            ],
        )?;

        self.get_transaction(&tx.hash)?.ok_or(StoreError::NotFound)
    }

    pub fn get_transaction(&self, hash: &TxHash) -> Result<Option<TxRecord>> {
        self.conn()
            .query_row(
                "SELECT hash, block_number, from_address, to_address, input,
                        batch_id, created_at
                 FROM transactions WHERE hash = ?1",
                params![hash.to_hex()],
                row_to_tx_record,
            )
            .optional()
            .map_err(StoreError::Sqlite)
    }

    /// Whether the transaction is already linked to a confirmed batch.
    pub fn transaction_has_confirmed_batch(&self, hash: &TxHash) -> Result<bool> {
        let confirmed: Option<String> = self
            .conn()
            .query_row(
                "SELECT b.id
                 FROM transactions t
                 JOIN batches b ON b.id = t.batch_id
                 WHERE t.hash = ?1 AND b.status = 'confirmed'",
                params![hash.to_hex()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(confirmed.is_some())
    }

    /// Associate a transaction with its batch, exactly once.
    ///
    /// Linking the same batch again is a no-op; linking a *different*
    /// batch contradicts an established association and fails loudly.
    pub fn link_transaction_to_batch(&self, hash: &TxHash, batch_id: Uuid) -> Result<()> {
        let current: Option<Option<String>> = self
            .conn()
            .query_row(
                "SELECT batch_id FROM transactions WHERE hash = ?1",
                params![hash.to_hex()],
                |row| row.get(0),
            )
            .optional()?;

        let current = current.ok_or(StoreError::NotFound)?;

        match current {
            Some(existing) if existing == batch_id.to_string() => Ok(()),
            Some(existing) => Err(StoreError::Conflict(format!(
                "transaction {hash} already linked to batch {existing}, refusing {batch_id}"
            ))),
            None => {
                self.conn().execute(
                    "UPDATE transactions SET batch_id = ?1 WHERE hash = ?2",
                    params![batch_id.to_string(), hash.to_hex()],
                )?;
                Ok(())
            }
        }
    }

    /// Highest block number among recorded transactions addressed to
    /// `to`.  Used to derive a start height when no checkpoint exists.
    pub fn max_block_for_recipient(&self, to: &Address) -> Result<Option<u64>> {
        let max: Option<i64> = self.conn().query_row(
            "SELECT MAX(block_number) FROM transactions WHERE to_address = ?1",
            params![to.to_hex()],
            |row| row.get(0),
        )?;
        Ok(max.map(|n| n as u64))
    }
}

/// Map a `rusqlite::Row` to a [`TxRecord`].
fn row_to_tx_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<TxRecord> {
    let hash_str: String = row.get(0)?;
    let block_number: i64 = row.get(1)?;
    let from_str: String = row.get(2)?;
    let to_str: Option<String> = row.get(3)?;
    let input: Vec<u8> = row.get(4)?;
    let batch_str: Option<String> = row.get(5)?;
    let created_str: String = row.get(6)?;

    let hash = TxHash::from_hex(&hash_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let from_address = Address::from_hex(&from_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let to_address = to_str
        .map(|s| Address::from_hex(&s))
        .transpose()
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;
    let batch_id = batch_str.map(|s| parse_uuid(&s, 5)).transpose()?;

    Ok(TxRecord {
        hash,
        block_number: block_number as u64,
        from_address,
        to_address,
        input,
        batch_id,
        created_at: parse_timestamp(&created_str, 6)?,
    })
}
