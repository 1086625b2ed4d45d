//! Follow upserts and lookups.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::messages::{parse_opt_timestamp, parse_timestamp, parse_uuid};
use crate::models::Follow;

impl Database {
    /// Find-or-initialize a follow by (from-account, uuid), point it at
    /// `to_account_id`, and confirm it.
    pub fn upsert_follow(
        &self,
        from_account_id: Uuid,
        uuid: Uuid,
        to_account_id: Uuid,
        hidden_at: Option<DateTime<Utc>>,
    ) -> Result<Follow> {
        let existing = self.get_follow(from_account_id, uuid)?;

        match existing {
            Some(f) => {
                self.conn().execute(
                    "UPDATE follows
                     SET to_account_id = ?1, hidden_at = ?2, confirmed = 1
                     WHERE id = ?3",
                    params![
                        to_account_id.to_string(),
                        hidden_at.map(|t| t.to_rfc3339()),
                        f.id.to_string(),
                    ],
                )?;
            }
            None => {
                self.conn().execute(
                    "INSERT INTO follows
                         (id, from_account_id, uuid, to_account_id, hidden_at,
                          confirmed, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
                    params![
                        Uuid::new_v4().to_string(),
                        from_account_id.to_string(),
                        uuid.to_string(),
                        to_account_id.to_string(),
                        hidden_at.map(|t| t.to_rfc3339()),
                        Utc::now().to_rfc3339(),
                    ],
                )?;
            }
        }

        self.get_follow(from_account_id, uuid)?
            .ok_or(StoreError::NotFound)
    }

    pub fn get_follow(&self, from_account_id: Uuid, uuid: Uuid) -> Result<Option<Follow>> {
        self.conn()
            .query_row(
                "SELECT id, from_account_id, uuid, to_account_id, hidden_at,
                        confirmed, created_at
                 FROM follows WHERE from_account_id = ?1 AND uuid = ?2",
                params![from_account_id.to_string(), uuid.to_string()],
                row_to_follow,
            )
            .optional()
            .map_err(StoreError::Sqlite)
    }

    /// List accounts `from_account_id` follows, oldest first.
    pub fn list_follows_for_account(&self, from_account_id: Uuid) -> Result<Vec<Follow>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, from_account_id, uuid, to_account_id, hidden_at,
                    confirmed, created_at
             FROM follows
             WHERE from_account_id = ?1
             ORDER BY created_at ASC",
        )?;

        let rows = stmt.query_map(params![from_account_id.to_string()], row_to_follow)?;

        let mut follows = Vec::new();
        for row in rows {
            follows.push(row?);
        }
        Ok(follows)
    }
}

/// Map a `rusqlite::Row` to a [`Follow`].
fn row_to_follow(row: &rusqlite::Row<'_>) -> rusqlite::Result<Follow> {
    let id_str: String = row.get(0)?;
    let from_str: String = row.get(1)?;
    let uuid_str: String = row.get(2)?;
    let to_str: String = row.get(3)?;
    let hidden_str: Option<String> = row.get(4)?;
    let confirmed: bool = row.get(5)?;
    let created_str: String = row.get(6)?;

    Ok(Follow {
        id: parse_uuid(&id_str, 0)?,
        from_account_id: parse_uuid(&from_str, 1)?,
        uuid: parse_uuid(&uuid_str, 2)?,
        to_account_id: parse_uuid(&to_str, 3)?,
        hidden_at: parse_opt_timestamp(hidden_str, 4)?,
        confirmed,
        created_at: parse_timestamp(&created_str, 6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use numa_shared::Address;

    #[test]
    fn upsert_is_idempotent_per_uuid() {
        let db = Database::open_in_memory().unwrap();
        let alice = db.make_account_by_address(&Address([1; 20])).unwrap();
        let bob = db.make_account_by_address(&Address([2; 20])).unwrap();
        let uuid = Uuid::new_v4();

        let first = db.upsert_follow(alice.id, uuid, bob.id, None).unwrap();
        let second = db.upsert_follow(alice.id, uuid, bob.id, None).unwrap();

        assert_eq!(first.id, second.id);
        assert!(second.confirmed);
        assert_eq!(db.list_follows_for_account(alice.id).unwrap().len(), 1);
    }

    #[test]
    fn redelivery_can_retarget_follow() {
        let db = Database::open_in_memory().unwrap();
        let alice = db.make_account_by_address(&Address([1; 20])).unwrap();
        let bob = db.make_account_by_address(&Address([2; 20])).unwrap();
        let carol = db.make_account_by_address(&Address([3; 20])).unwrap();
        let uuid = Uuid::new_v4();

        db.upsert_follow(alice.id, uuid, bob.id, None).unwrap();
        let updated = db.upsert_follow(alice.id, uuid, carol.id, None).unwrap();
        assert_eq!(updated.to_account_id, carol.id);
    }
}
