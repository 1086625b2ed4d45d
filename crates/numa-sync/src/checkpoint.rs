//! Checkpoint store backed by the SQLite `sync_state` table.

use std::sync::Arc;

use numa_shared::{CheckpointError, CheckpointStore};
use numa_store::Database;

/// Default slot name for the block checkpoint.
pub const LAST_BLOCK_SYNCED: &str = "last_block_synced";

/// Durable checkpoint in the same database as the domain model, so a
/// deployment has one file to back up.
pub struct SqliteCheckpoint {
    db: Arc<Database>,
    key: String,
}

impl SqliteCheckpoint {
    pub fn new(db: Arc<Database>) -> Self {
        Self::with_key(db, LAST_BLOCK_SYNCED)
    }

    pub fn with_key(db: Arc<Database>, key: impl Into<String>) -> Self {
        Self {
            db,
            key: key.into(),
        }
    }
}

impl CheckpointStore for SqliteCheckpoint {
    fn read(&self) -> Result<Option<u64>, CheckpointError> {
        self.db
            .read_sync_state(&self.key)
            .map_err(|e| CheckpointError(e.to_string()))
    }

    fn write(&self, height: u64) -> Result<(), CheckpointError> {
        self.db
            .write_sync_state(&self.key, height)
            .map_err(|e| CheckpointError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let checkpoint = SqliteCheckpoint::new(db);

        assert_eq!(checkpoint.read().unwrap(), None);
        checkpoint.write(7).unwrap();
        assert_eq!(checkpoint.read().unwrap(), Some(7));
    }

    #[test]
    fn keys_are_independent_slots() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let a = SqliteCheckpoint::with_key(db.clone(), "chain_a");
        let b = SqliteCheckpoint::with_key(db, "chain_b");

        a.write(1).unwrap();
        assert_eq!(b.read().unwrap(), None);
    }
}
