//! Account upserts and lookups.
//!
//! Accounts are addressable by their deterministic on-chain address;
//! [`Database::make_account_by_address`] is the idempotent
//! upsert-by-address every other handler builds on.

use chrono::{DateTime, Utc};
use numa_shared::Address;
use rand::RngCore;
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Account;

/// Profile fields published by a `Person` activity item.
#[derive(Debug, Clone, Default)]
pub struct AccountProfile {
    pub username: String,
    pub bio: Option<String>,
    pub display_name: Option<String>,
    pub avatar_address: Option<String>,
}

impl Database {
    /// Find the account for `address`, creating an unconfirmed stub if
    /// none exists.  Safe to call repeatedly.
    pub fn make_account_by_address(&self, address: &Address) -> Result<Account> {
        if let Some(account) = self.get_account_by_address(address)? {
            return Ok(account);
        }

        let account = Account {
            id: Uuid::new_v4(),
            address: *address,
            username: None,
            bio: None,
            display_name: None,
            avatar_address: None,
            confirmed: false,
            created_at: Utc::now(),
        };

        // A concurrent writer may have inserted the same address; the
        // unique index turns that into a no-op and we re-read.
        let inserted = self.conn().execute(
            "INSERT OR IGNORE INTO accounts (id, address, confirmed, created_at)
             VALUES (?1, ?2, 0, ?3)",
            params![
                account.id.to_string(),
                address.to_hex(),
                account.created_at.to_rfc3339(),
            ],
        )?;

        if inserted == 0 {
            return self
                .get_account_by_address(address)?
                .ok_or(StoreError::NotFound);
        }
        Ok(account)
    }

    /// Apply a synced profile to `account_id` and confirm the account.
    ///
    /// The username is normalized to lower case.  If a *different*
    /// account already owns it, a random disambiguating suffix is
    /// appended, so the case-insensitive uniqueness invariant holds.
    /// Returns the username actually stored.
    pub fn upsert_account_profile(
        &self,
        account_id: Uuid,
        profile: &AccountProfile,
    ) -> Result<String> {
        let mut username = profile.username.to_lowercase();

        let taken: Option<String> = self
            .conn()
            .query_row(
                "SELECT id FROM accounts
                 WHERE lower(username) = ?1 AND id != ?2",
                params![username, account_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        if taken.is_some() {
            username = format!("{}_{}", username, random_suffix());
        }

        let affected = self.conn().execute(
            "UPDATE accounts
             SET username = ?1, bio = ?2, display_name = ?3,
                 avatar_address = ?4, confirmed = 1
             WHERE id = ?5",
            params![
                username,
                profile.bio,
                profile.display_name,
                profile.avatar_address,
                account_id.to_string(),
            ],
        )?;

        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(username)
    }

    /// Flip the confirmation flag.  Setting it twice is a no-op.
    pub fn confirm_account(&self, account_id: Uuid) -> Result<()> {
        self.conn().execute(
            "UPDATE accounts SET confirmed = 1 WHERE id = ?1",
            params![account_id.to_string()],
        )?;
        Ok(())
    }

    pub fn get_account(&self, id: Uuid) -> Result<Account> {
        self.conn()
            .query_row(
                "SELECT id, address, username, bio, display_name, avatar_address,
                        confirmed, created_at
                 FROM accounts WHERE id = ?1",
                params![id.to_string()],
                row_to_account,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    pub fn get_account_by_address(&self, address: &Address) -> Result<Option<Account>> {
        self.conn()
            .query_row(
                "SELECT id, address, username, bio, display_name, avatar_address,
                        confirmed, created_at
                 FROM accounts WHERE address = ?1",
                params![address.to_hex()],
                row_to_account,
            )
            .optional()
            .map_err(StoreError::Sqlite)
    }

    /// Case-insensitive username lookup.
    pub fn get_account_by_username(&self, username: &str) -> Result<Option<Account>> {
        self.conn()
            .query_row(
                "SELECT id, address, username, bio, display_name, avatar_address,
                        confirmed, created_at
                 FROM accounts WHERE lower(username) = ?1",
                params![username.to_lowercase()],
                row_to_account,
            )
            .optional()
            .map_err(StoreError::Sqlite)
    }
}

/// Ten hex chars of randomness, enough to make a collision suffix unique
/// in practice.
fn random_suffix() -> String {
    let mut bytes = [0u8; 5];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Map a `rusqlite::Row` to an [`Account`].
pub(crate) fn row_to_account(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
    let id_str: String = row.get(0)?;
    let address_str: String = row.get(1)?;
    let username: Option<String> = row.get(2)?;
    let bio: Option<String> = row.get(3)?;
    let display_name: Option<String> = row.get(4)?;
    let avatar_address: Option<String> = row.get(5)?;
    let confirmed: bool = row.get(6)?;
    let created_str: String = row.get(7)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let address = Address::from_hex(&address_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Account {
        id,
        address,
        username,
        bio,
        display_name,
        avatar_address,
        confirmed,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn addr(byte: u8) -> Address {
        Address([byte; 20])
    }

    #[test]
    fn make_by_address_is_idempotent() {
        let db = test_db();
        let a = db.make_account_by_address(&addr(1)).unwrap();
        let b = db.make_account_by_address(&addr(1)).unwrap();
        assert_eq!(a.id, b.id);
        assert!(!a.confirmed);
    }

    #[test]
    fn profile_upsert_lowercases_and_confirms() {
        let db = test_db();
        let account = db.make_account_by_address(&addr(1)).unwrap();

        let stored = db
            .upsert_account_profile(
                account.id,
                &AccountProfile {
                    username: "Alice".into(),
                    bio: Some("hi".into()),
                    display_name: Some("Alice A.".into()),
                    avatar_address: None,
                },
            )
            .unwrap();
        assert_eq!(stored, "alice");

        let account = db.get_account(account.id).unwrap();
        assert!(account.confirmed);
        assert_eq!(account.username.as_deref(), Some("alice"));
        assert_eq!(account.bio.as_deref(), Some("hi"));
    }

    #[test]
    fn profile_upsert_twice_is_stable() {
        let db = test_db();
        let account = db.make_account_by_address(&addr(1)).unwrap();
        let profile = AccountProfile {
            username: "alice".into(),
            ..Default::default()
        };

        let first = db.upsert_account_profile(account.id, &profile).unwrap();
        let second = db.upsert_account_profile(account.id, &profile).unwrap();
        assert_eq!(first, "alice");
        // Re-applying the same profile to the same account must not
        // trigger the collision suffix.
        assert_eq!(second, "alice");
    }

    #[test]
    fn username_collision_gets_suffix() {
        let db = test_db();
        let first = db.make_account_by_address(&addr(1)).unwrap();
        let second = db.make_account_by_address(&addr(2)).unwrap();

        let profile = AccountProfile {
            username: "Alice".into(),
            ..Default::default()
        };
        db.upsert_account_profile(first.id, &profile).unwrap();
        let stored = db.upsert_account_profile(second.id, &profile).unwrap();

        assert!(stored.starts_with("alice_"));
        assert_eq!(stored.len(), "alice_".len() + 10);

        let a = db.get_account(first.id).unwrap();
        let b = db.get_account(second.id).unwrap();
        assert_ne!(
            a.username.unwrap().to_lowercase(),
            b.username.unwrap().to_lowercase()
        );
    }

    #[test]
    fn username_lookup_is_case_insensitive() {
        let db = test_db();
        let account = db.make_account_by_address(&addr(1)).unwrap();
        db.upsert_account_profile(
            account.id,
            &AccountProfile {
                username: "Alice".into(),
                ..Default::default()
            },
        )
        .unwrap();

        let found = db.get_account_by_username("ALICE").unwrap().unwrap();
        assert_eq!(found.id, account.id);
    }
}
