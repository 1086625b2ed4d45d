//! Named key/value slots in the `sync_state` table.
//!
//! The sync engine keeps its block checkpoint here: read once at start,
//! written once after each successful full range sweep.

use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::error::{Result, StoreError};

impl Database {
    /// Read a checkpoint slot.  A stored value that fails to parse as a
    /// block height is surfaced as an error so the caller can fall back
    /// to deriving the height from history.
    pub fn read_sync_state(&self, key: &str) -> Result<Option<u64>> {
        let value: Option<String> = self
            .conn()
            .query_row(
                "SELECT value FROM sync_state WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        value
            .map(|v| {
                v.parse::<u64>()
                    .map_err(|e| StoreError::Corrupt(format!("sync_state[{key}]: {e}")))
            })
            .transpose()
    }

    /// Write (upsert) a checkpoint slot.
    pub fn write_sync_state(&self, key: &str, height: u64) -> Result<()> {
        self.conn().execute(
            "INSERT INTO sync_state (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, height.to_string()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_slot_reads_none() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.read_sync_state("last_block_synced").unwrap(), None);
    }

    #[test]
    fn write_then_overwrite() {
        let db = Database::open_in_memory().unwrap();
        db.write_sync_state("last_block_synced", 10).unwrap();
        db.write_sync_state("last_block_synced", 42).unwrap();
        assert_eq!(db.read_sync_state("last_block_synced").unwrap(), Some(42));
    }

    #[test]
    fn corrupt_value_is_an_error_not_a_panic() {
        let db = Database::open_in_memory().unwrap();
        db.conn()
            .execute(
                "INSERT INTO sync_state (key, value) VALUES ('last_block_synced', 'junk')",
                [],
            )
            .unwrap();
        assert!(db.read_sync_state("last_block_synced").is_err());
    }
}
