//! Message upserts and lookups.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Message, MessageSchema};

/// Fields applied when a `Note` or `Article` item syncs.
#[derive(Debug, Clone)]
pub struct MessageUpsert {
    pub uuid: Uuid,
    pub schema: MessageSchema,
    pub body: Option<String>,
    pub title: Option<String>,
    pub tldr: Option<String>,
    pub hidden_at: Option<DateTime<Utc>>,
}

impl Database {
    /// Find-or-initialize a message by (account, uuid), apply the synced
    /// fields, and confirm it.  Redelivering the same document converges
    /// on the same row.
    pub fn upsert_message(&self, account_id: Uuid, upsert: &MessageUpsert) -> Result<Message> {
        let existing = self.get_message(account_id, upsert.uuid)?;

        let id = match existing {
            Some(m) => {
                self.conn().execute(
                    "UPDATE messages
                     SET json_schema = ?1, body = ?2, title = ?3, tldr = ?4,
                         hidden_at = ?5, confirmed = 1
                     WHERE id = ?6",
                    params![
                        upsert.schema.as_str(),
                        upsert.body,
                        upsert.title,
                        upsert.tldr,
                        upsert.hidden_at.map(|t| t.to_rfc3339()),
                        m.id.to_string(),
                    ],
                )?;
                m.id
            }
            None => {
                let id = Uuid::new_v4();
                self.conn().execute(
                    "INSERT INTO messages
                         (id, account_id, uuid, json_schema, body, title, tldr,
                          hidden_at, confirmed, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9)",
                    params![
                        id.to_string(),
                        account_id.to_string(),
                        upsert.uuid.to_string(),
                        upsert.schema.as_str(),
                        upsert.body,
                        upsert.title,
                        upsert.tldr,
                        upsert.hidden_at.map(|t| t.to_rfc3339()),
                        Utc::now().to_rfc3339(),
                    ],
                )?;
                id
            }
        };

        self.get_message(account_id, upsert.uuid)?
            .filter(|m| m.id == id)
            .ok_or(StoreError::NotFound)
    }

    /// Fetch a message by its owning account and publisher-assigned uuid.
    pub fn get_message(&self, account_id: Uuid, uuid: Uuid) -> Result<Option<Message>> {
        self.conn()
            .query_row(
                "SELECT id, account_id, uuid, json_schema, body, title, tldr,
                        hidden_at, confirmed, created_at
                 FROM messages WHERE account_id = ?1 AND uuid = ?2",
                params![account_id.to_string(), uuid.to_string()],
                row_to_message,
            )
            .optional()
            .map_err(StoreError::Sqlite)
    }

    /// Global lookup by publisher-assigned uuid, used to resolve `Like`
    /// targets.  Returns the first match.
    pub fn get_message_by_uuid(&self, uuid: Uuid) -> Result<Option<Message>> {
        self.conn()
            .query_row(
                "SELECT id, account_id, uuid, json_schema, body, title, tldr,
                        hidden_at, confirmed, created_at
                 FROM messages WHERE uuid = ?1
                 ORDER BY created_at ASC LIMIT 1",
                params![uuid.to_string()],
                row_to_message,
            )
            .optional()
            .map_err(StoreError::Sqlite)
    }

    /// List an account's messages, newest first.
    pub fn list_messages_for_account(&self, account_id: Uuid) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, account_id, uuid, json_schema, body, title, tldr,
                    hidden_at, confirmed, created_at
             FROM messages
             WHERE account_id = ?1
             ORDER BY created_at DESC",
        )?;

        let rows = stmt.query_map(params![account_id.to_string()], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }
}

/// Map a `rusqlite::Row` to a [`Message`].
fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let id_str: String = row.get(0)?;
    let account_id_str: String = row.get(1)?;
    let uuid_str: String = row.get(2)?;
    let schema_str: String = row.get(3)?;
    let body: Option<String> = row.get(4)?;
    let title: Option<String> = row.get(5)?;
    let tldr: Option<String> = row.get(6)?;
    let hidden_str: Option<String> = row.get(7)?;
    let confirmed: bool = row.get(8)?;
    let created_str: String = row.get(9)?;

    let id = parse_uuid(&id_str, 0)?;
    let account_id = parse_uuid(&account_id_str, 1)?;
    let uuid = parse_uuid(&uuid_str, 2)?;

    let schema = MessageSchema::from_str(&schema_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown message schema: {schema_str}").into(),
        )
    })?;

    let hidden_at = parse_opt_timestamp(hidden_str, 7)?;
    let created_at = parse_timestamp(&created_str, 9)?;

    Ok(Message {
        id,
        account_id,
        uuid,
        schema,
        body,
        title,
        tldr,
        hidden_at,
        confirmed,
        created_at,
    })
}

pub(crate) fn parse_uuid(s: &str, col: usize) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn parse_timestamp(s: &str, col: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(e))
        })
}

pub(crate) fn parse_opt_timestamp(
    s: Option<String>,
    col: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    s.map(|s| parse_timestamp(&s, col)).transpose()
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
    fn upsert_creates_then_updates() {
        let (db, account_id) = setup();
        let uuid = Uuid::new_v4();

        let first = db
            .upsert_message(
                account_id,
                &MessageUpsert {
                    uuid,
                    schema: MessageSchema::Micro,
                    body: Some("hello".into()),
                    title: None,
                    tldr: None,
                    hidden_at: None,
                },
            )
            .unwrap();
        assert!(first.confirmed);

        let second = db
            .upsert_message(
                account_id,
                &MessageUpsert {
                    uuid,
                    schema: MessageSchema::Article,
                    body: Some("longer".into()),
                    title: Some("Title".into()),
                    tldr: Some("tl;dr".into()),
                    hidden_at: None,
                },
            )
            .unwrap();

        // Same row, updated in place.
        assert_eq!(first.id, second.id);
        assert_eq!(second.schema, MessageSchema::Article);
        assert_eq!(second.title.as_deref(), Some("Title"));
        assert_eq!(db.list_messages_for_account(account_id).unwrap().len(), 1);
    }

    #[test]
    fn uuid_is_scoped_per_account() {
        let (db, first_account) = setup();
        let other = db.make_account_by_address(&Address([2; 20])).unwrap();
        let uuid = Uuid::new_v4();

        let upsert = MessageUpsert {
            uuid,
            schema: MessageSchema::Micro,
            body: Some("same uuid, different sender".into()),
            title: None,
            tldr: None,
            hidden_at: None,
        };
        let a = db.upsert_message(first_account, &upsert).unwrap();
        let b = db.upsert_message(other.id, &upsert).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn lookup_by_uuid_resolves_like_targets() {
        let (db, account_id) = setup();
        let uuid = Uuid::new_v4();
        db.upsert_message(
            account_id,
            &MessageUpsert {
                uuid,
                schema: MessageSchema::Micro,
                body: None,
                title: None,
                tldr: None,
                hidden_at: None,
            },
        )
        .unwrap();

        assert!(db.get_message_by_uuid(uuid).unwrap().is_some());
        assert!(db.get_message_by_uuid(Uuid::new_v4()).unwrap().is_none());
    }
}
