//! Favorite upserts and lookups.
//!
//! A favorite references its target message by publisher-assigned uuid.
//! If the message has not synced yet the reference is left null rather
//! than treated as an error; a later redelivery fills it in.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::messages::{parse_opt_timestamp, parse_timestamp, parse_uuid};
use crate::models::Favorite;

impl Database {
    /// Find-or-initialize a favorite by (from-account, uuid), set its
    /// message reference (possibly null), and confirm it.
    pub fn upsert_favorite(
        &self,
        from_account_id: Uuid,
        uuid: Uuid,
        message_id: Option<Uuid>,
        hidden_at: Option<DateTime<Utc>>,
    ) -> Result<Favorite> {
        let existing = self.get_favorite(from_account_id, uuid)?;

        match existing {
            Some(f) => {
                self.conn().execute(
                    "UPDATE favorites
                     SET message_id = ?1, hidden_at = ?2, confirmed = 1
                     WHERE id = ?3",
                    params![
                        message_id.map(|m| m.to_string()),
                        hidden_at.map(|t| t.to_rfc3339()),
                        f.id.to_string(),
                    ],
                )?;
            }
            None => {
                self.conn().execute(
                    "INSERT INTO favorites
                         (id, from_account_id, uuid, message_id, hidden_at,
                          confirmed, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
                    params![
                        Uuid::new_v4().to_string(),
                        from_account_id.to_string(),
                        uuid.to_string(),
                        message_id.map(|m| m.to_string()),
                        hidden_at.map(|t| t.to_rfc3339()),
                        Utc::now().to_rfc3339(),
                    ],
                )?;
            }
        }

        self.get_favorite(from_account_id, uuid)?
            .ok_or(StoreError::NotFound)
    }

    pub fn get_favorite(&self, from_account_id: Uuid, uuid: Uuid) -> Result<Option<Favorite>> {
        self.conn()
            .query_row(
                "SELECT id, from_account_id, uuid, message_id, hidden_at,
                        confirmed, created_at
                 FROM favorites WHERE from_account_id = ?1 AND uuid = ?2",
                params![from_account_id.to_string(), uuid.to_string()],
                row_to_favorite,
            )
            .optional()
            .map_err(StoreError::Sqlite)
    }

    pub fn list_favorites_for_account(&self, from_account_id: Uuid) -> Result<Vec<Favorite>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, from_account_id, uuid, message_id, hidden_at,
                    confirmed, created_at
             FROM favorites
             WHERE from_account_id = ?1
             ORDER BY created_at ASC",
        )?;

        let rows = stmt.query_map(params![from_account_id.to_string()], row_to_favorite)?;

        let mut favorites = Vec::new();
        for row in rows {
            favorites.push(row?);
        }
        Ok(favorites)
    }
}

/// Map a `rusqlite::Row` to a [`Favorite`].
fn row_to_favorite(row: &rusqlite::Row<'_>) -> rusqlite::Result<Favorite> {
    let id_str: String = row.get(0)?;
    let from_str: String = row.get(1)?;
    let uuid_str: String = row.get(2)?;
    let message_str: Option<String> = row.get(3)?;
    let hidden_str: Option<String> = row.get(4)?;
    let confirmed: bool = row.get(5)?;
    let created_str: String = row.get(6)?;

    let message_id = message_str.map(|s| parse_uuid(&s, 3)).transpose()?;

    Ok(Favorite {
        id: parse_uuid(&id_str, 0)?,
        from_account_id: parse_uuid(&from_str, 1)?,
        uuid: parse_uuid(&uuid_str, 2)?,
        message_id,
        hidden_at: parse_opt_timestamp(hidden_str, 4)?,
        confirmed,
        created_at: parse_timestamp(&created_str, 6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::MessageUpsert;
    use crate::models::MessageSchema;
    use numa_shared::Address;

    #[test]
    fn unresolved_target_is_not_an_error() {
        let db = Database::open_in_memory().unwrap();
        let alice = db.make_account_by_address(&Address([1; 20])).unwrap();

        let favorite = db
            .upsert_favorite(alice.id, Uuid::new_v4(), None, None)
            .unwrap();
        assert!(favorite.message_id.is_none());
        assert!(favorite.confirmed);
    }

    #[test]
    fn redelivery_resolves_target_once_message_syncs() {
        let db = Database::open_in_memory().unwrap();
        let alice = db.make_account_by_address(&Address([1; 20])).unwrap();
        let fav_uuid = Uuid::new_v4();
        let msg_uuid = Uuid::new_v4();

        db.upsert_favorite(alice.id, fav_uuid, None, None).unwrap();

        let message = db
            .upsert_message(
                alice.id,
                &MessageUpsert {
                    uuid: msg_uuid,
                    schema: MessageSchema::Micro,
                    body: Some("late".into()),
                    title: None,
                    tldr: None,
                    hidden_at: None,
                },
            )
            .unwrap();

        let updated = db
            .upsert_favorite(alice.id, fav_uuid, Some(message.id), None)
            .unwrap();
        assert_eq!(updated.message_id, Some(message.id));
        assert_eq!(db.list_favorites_for_account(alice.id).unwrap().len(), 1);
    }
}
