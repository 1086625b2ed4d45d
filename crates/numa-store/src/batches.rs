//! Batch resolution and confirmation.
//!
//! A batch ties on-chain transactions to the effects of one activity
//! document.  The de-duplication key is (document uuid, account).  When
//! no batch with that key exists, the sender's single pending batch is
//! adopted instead of creating a detached one, so the "current batch"
//! concept stays consistent with the publishing client.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::messages::{parse_timestamp, parse_uuid};
use crate::models::{Batch, BatchStatus};

impl Database {
    /// Resolve the batch for (`doc_uuid`, `account_id`).
    ///
    /// Lookup by key first; on a miss, take the account's pending batch
    /// (creating one if the account has none) and adopt the document
    /// uuid onto it, so later redeliveries of the same document find it
    /// by key.
    pub fn resolve_batch(&self, account_id: Uuid, doc_uuid: Uuid) -> Result<Batch> {
        if let Some(batch) = self.get_batch(account_id, doc_uuid)? {
            return Ok(batch);
        }

        let pending = self.pending_batch_for(account_id)?;
        self.conn().execute(
            "UPDATE batches SET uuid = ?1 WHERE id = ?2",
            params![doc_uuid.to_string(), pending.id.to_string()],
        )?;

        self.get_batch(account_id, doc_uuid)?
            .ok_or(StoreError::NotFound)
    }

    /// The account's current pending batch, created on first use.  At
    /// most one pending batch exists per account.
    pub fn pending_batch_for(&self, account_id: Uuid) -> Result<Batch> {
        let existing = self
            .conn()
            .query_row(
                "SELECT id, uuid, account_id, status, created_at
                 FROM batches
                 WHERE account_id = ?1 AND status = 'pending'
                 ORDER BY created_at ASC LIMIT 1",
                params![account_id.to_string()],
                row_to_batch,
            )
            .optional()?;

        if let Some(batch) = existing {
            return Ok(batch);
        }

        let batch = Batch {
            id: Uuid::new_v4(),
            uuid: Uuid::new_v4(),
            account_id,
            status: BatchStatus::Pending,
            created_at: Utc::now(),
        };
        self.conn().execute(
            "INSERT INTO batches (id, uuid, account_id, status, created_at)
             VALUES (?1, ?2, ?3, 'pending', ?4)",
            params![
                batch.id.to_string(),
                batch.uuid.to_string(),
                batch.account_id.to_string(),
                batch.created_at.to_rfc3339(),
            ],
        )?;
        Ok(batch)
    }

    /// Confirm a batch.  The transition is terminal; confirming an
    /// already-confirmed batch is a no-op.
    pub fn confirm_batch(&self, batch_id: Uuid) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE batches SET status = 'confirmed'
             WHERE id = ?1 AND status != 'confirmed'",
            params![batch_id.to_string()],
        )?;
        if affected == 0 {
            // Either already confirmed (fine) or missing (a bug).
            let exists: Option<String> = self
                .conn()
                .query_row(
                    "SELECT id FROM batches WHERE id = ?1",
                    params![batch_id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_none() {
                return Err(StoreError::NotFound);
            }
        }
        Ok(())
    }

    pub fn get_batch(&self, account_id: Uuid, uuid: Uuid) -> Result<Option<Batch>> {
        self.conn()
            .query_row(
                "SELECT id, uuid, account_id, status, created_at
                 FROM batches WHERE account_id = ?1 AND uuid = ?2",
                params![account_id.to_string(), uuid.to_string()],
                row_to_batch,
            )
            .optional()
            .map_err(StoreError::Sqlite)
    }

    pub fn get_batch_by_id(&self, id: Uuid) -> Result<Batch> {
        self.conn()
            .query_row(
                "SELECT id, uuid, account_id, status, created_at
                 FROM batches WHERE id = ?1",
                params![id.to_string()],
                row_to_batch,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Number of batches for an account, for invariant checks.
    pub fn count_batches_for_account(&self, account_id: Uuid) -> Result<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT count(*) FROM batches WHERE account_id = ?1",
            params![account_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

/// Map a `rusqlite::Row` to a [`Batch`].
fn row_to_batch(row: &rusqlite::Row<'_>) -> rusqlite::Result<Batch> {
    let id_str: String = row.get(0)?;
    let uuid_str: String = row.get(1)?;
    let account_str: String = row.get(2)?;
    let status_str: String = row.get(3)?;
    let created_str: String = row.get(4)?;

    let status = BatchStatus::from_str(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown batch status: {status_str}").into(),
        )
    })?;

    Ok(Batch {
        id: parse_uuid(&id_str, 0)?,
        uuid: parse_uuid(&uuid_str, 1)?,
        account_id: parse_uuid(&account_str, 2)?,
        status,
        created_at: parse_timestamp(&created_str, 4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use numa_shared::Address;

    fn setup() -> (Database, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let account = db.make_account_by_address(&Address([1; 20])).unwrap();
        (db, account.id)
    }

    #[test]
    fn pending_batch_is_a_singleton_slot() {
        let (db, account_id) = setup();
        let a = db.pending_batch_for(account_id).unwrap();
        let b = db.pending_batch_for(account_id).unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(db.count_batches_for_account(account_id).unwrap(), 1);
    }

    #[test]
    fn resolve_adopts_document_uuid_onto_pending_batch() {
        let (db, account_id) = setup();
        let doc_uuid = Uuid::new_v4();

        let resolved = db.resolve_batch(account_id, doc_uuid).unwrap();
        assert_eq!(resolved.uuid, doc_uuid);
        assert_eq!(resolved.status, BatchStatus::Pending);

        // Second resolution finds the same batch by key.
        let again = db.resolve_batch(account_id, doc_uuid).unwrap();
        assert_eq!(resolved.id, again.id);
        assert_eq!(db.count_batches_for_account(account_id).unwrap(), 1);
    }

    #[test]
    fn confirm_is_terminal_and_idempotent() {
        let (db, account_id) = setup();
        let batch = db.resolve_batch(account_id, Uuid::new_v4()).unwrap();

        db.confirm_batch(batch.id).unwrap();
        db.confirm_batch(batch.id).unwrap();

        let reread = db.get_batch_by_id(batch.id).unwrap();
        assert_eq!(reread.status, BatchStatus::Confirmed);
    }

    #[test]
    fn confirming_missing_batch_is_loud() {
        let (db, _) = setup();
        assert!(matches!(
            db.confirm_batch(Uuid::new_v4()),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn confirmed_batch_does_not_shadow_pending_slot() {
        let (db, account_id) = setup();
        let first = db.resolve_batch(account_id, Uuid::new_v4()).unwrap();
        db.confirm_batch(first.id).unwrap();

        // A new document gets a fresh pending batch, not the confirmed one.
        let second = db.resolve_batch(account_id, Uuid::new_v4()).unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(second.status, BatchStatus::Pending);
    }
}
