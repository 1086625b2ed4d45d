//! Parsed activity-stream documents.
//!
//! A document is an ordered collection of typed items published by one
//! sender and stored in the content-addressed store.  Shapes we do not
//! recognize deserialize to [`ActivityItem::Unknown`] and are skipped by
//! the processor, so newer publishers do not break older indexers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Address;

/// An activity-stream document fetched from the content store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityDocument {
    pub uuid: Uuid,
    #[serde(rename = "orderedItems")]
    pub items: Vec<ActivityItem>,
}

/// Reference to an avatar image stored in the content store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Icon {
    pub ipfs_hash: String,
}

/// Target of a `Follow`: an account referenced by chain address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountRef {
    pub address: Address,
}

/// Target of a `Like`: a message referenced by UUID.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageRef {
    pub uuid: Uuid,
}

/// One typed item inside an activity document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ActivityItem {
    /// Profile update for the sending account.
    Person {
        #[serde(rename = "preferredUsername")]
        preferred_username: String,
        #[serde(default)]
        summary: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        icon: Option<Icon>,
    },
    /// A short-form message.
    Note {
        uuid: Uuid,
        #[serde(rename = "plainTextContent", default)]
        body: Option<String>,
        #[serde(rename = "hiddenAt", default)]
        hidden_at: Option<DateTime<Utc>>,
    },
    /// A long-form message with a title and summary.
    Article {
        uuid: Uuid,
        #[serde(rename = "plainTextContent", default)]
        body: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        summary: Option<String>,
        #[serde(rename = "hiddenAt", default)]
        hidden_at: Option<DateTime<Utc>>,
    },
    /// The sender follows another account.
    Follow {
        uuid: Uuid,
        object: AccountRef,
        #[serde(rename = "hiddenAt", default)]
        hidden_at: Option<DateTime<Utc>>,
    },
    /// The sender favorites a message.
    Like {
        uuid: Uuid,
        object: MessageRef,
        #[serde(rename = "hiddenAt", default)]
        hidden_at: Option<DateTime<Utc>>,
    },
    /// Any item type this indexer does not understand.
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_person_item() {
        let json = serde_json::json!({
            "uuid": "6f2b4a34-9f3a-4a5e-8f60-1c1d2e3f4a5b",
            "orderedItems": [{
                "type": "Person",
                "preferredUsername": "Alice",
                "summary": "hello",
                "name": "Alice A.",
                "icon": { "ipfs_hash": "QmAvatar" }
            }]
        });
        let doc: ActivityDocument = serde_json::from_value(json).unwrap();
        assert_eq!(doc.items.len(), 1);
        match &doc.items[0] {
            ActivityItem::Person {
                preferred_username,
                icon,
                ..
            } => {
                assert_eq!(preferred_username, "Alice");
                assert_eq!(icon.as_ref().unwrap().ipfs_hash, "QmAvatar");
            }
            other => panic!("unexpected item: {other:?}"),
        }
    }

    #[test]
    fn parses_note_with_optional_fields_absent() {
        let json = serde_json::json!({
            "uuid": "6f2b4a34-9f3a-4a5e-8f60-1c1d2e3f4a5b",
            "orderedItems": [{
                "type": "Note",
                "uuid": "0a0a0a0a-0b0b-0c0c-0d0d-0e0e0e0e0e0e"
            }]
        });
        let doc: ActivityDocument = serde_json::from_value(json).unwrap();
        match &doc.items[0] {
            ActivityItem::Note {
                body, hidden_at, ..
            } => {
                assert!(body.is_none());
                assert!(hidden_at.is_none());
            }
            other => panic!("unexpected item: {other:?}"),
        }
    }

    #[test]
    fn unknown_item_types_do_not_fail_parsing() {
        let json = serde_json::json!({
            "uuid": "6f2b4a34-9f3a-4a5e-8f60-1c1d2e3f4a5b",
            "orderedItems": [
                { "type": "Tip", "amount": 100 },
                { "type": "Note", "uuid": "0a0a0a0a-0b0b-0c0c-0d0d-0e0e0e0e0e0e" }
            ]
        });
        let doc: ActivityDocument = serde_json::from_value(json).unwrap();
        assert_eq!(doc.items[0], ActivityItem::Unknown);
        assert!(matches!(doc.items[1], ActivityItem::Note { .. }));
    }

    #[test]
    fn follow_carries_target_address() {
        let json = serde_json::json!({
            "uuid": "6f2b4a34-9f3a-4a5e-8f60-1c1d2e3f4a5b",
            "orderedItems": [{
                "type": "Follow",
                "uuid": "0a0a0a0a-0b0b-0c0c-0d0d-0e0e0e0e0e0e",
                "object": { "address": "0xABCDEF0123456789abcdef0123456789abcdef01" }
            }]
        });
        let doc: ActivityDocument = serde_json::from_value(json).unwrap();
        match &doc.items[0] {
            ActivityItem::Follow { object, .. } => {
                assert_eq!(
                    object.address.to_hex(),
                    "0xabcdef0123456789abcdef0123456789abcdef01"
                );
            }
            other => panic!("unexpected item: {other:?}"),
        }
    }
}
