//! Batch processor: applies one activity document to the domain model
//! and confirms the batch it belongs to.
//!
//! Every step is idempotent, so redelivering a document after a crash
//! between steps converges on the same end state:
//!
//! 1. each item upserts its domain entity (in document order),
//! 2. the batch for (document uuid, sender) is resolved,
//! 3. the transaction is linked to the batch (at most once),
//! 4. the batch is confirmed (terminal, re-confirming is a no-op).

use std::sync::Arc;

use numa_shared::{ActivityDocument, ActivityItem, ChainTransaction};
use numa_store::{
    Account, AccountProfile, Database, MessageSchema, MessageUpsert, StoreError,
};

/// Applies activity documents to the local domain model.
pub struct BatchProcessor {
    db: Arc<Database>,
}

impl BatchProcessor {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Apply `doc` on behalf of the transaction that published it.
    pub fn process(
        &self,
        tx: &ChainTransaction,
        doc: &ActivityDocument,
    ) -> Result<(), StoreError> {
        let sender = self.db.make_account_by_address(&tx.from)?;

        for item in &doc.items {
            self.apply_item(&sender, item)?;
        }

        let batch = self.db.resolve_batch(sender.id, doc.uuid)?;
        self.db.link_transaction_to_batch(&tx.hash, batch.id)?;
        self.db.confirm_batch(batch.id)?;

        tracing::debug!(
            tx = %tx.hash.short(),
            doc = %doc.uuid,
            batch = %batch.id,
            items = doc.items.len(),
            "batch applied"
        );
        Ok(())
    }

    fn apply_item(&self, sender: &Account, item: &ActivityItem) -> Result<(), StoreError> {
        match item {
            ActivityItem::Person {
                preferred_username,
                summary,
                name,
                icon,
            } => {
                self.db.upsert_account_profile(
                    sender.id,
                    &AccountProfile {
                        username: preferred_username.clone(),
                        bio: summary.clone(),
                        display_name: name.clone(),
                        avatar_address: icon.as_ref().map(|i| i.ipfs_hash.clone()),
                    },
                )?;
            }
            ActivityItem::Note {
                uuid,
                body,
                hidden_at,
            } => {
                self.db.upsert_message(
                    sender.id,
                    &MessageUpsert {
                        uuid: *uuid,
                        schema: MessageSchema::Micro,
                        body: body.clone(),
                        title: None,
                        tldr: None,
                        hidden_at: *hidden_at,
                    },
                )?;
            }
            ActivityItem::Article {
                uuid,
                body,
                name,
                summary,
                hidden_at,
            } => {
                self.db.upsert_message(
                    sender.id,
                    &MessageUpsert {
                        uuid: *uuid,
                        schema: MessageSchema::Article,
                        body: body.clone(),
                        title: name.clone(),
                        tldr: summary.clone(),
                        hidden_at: *hidden_at,
                    },
                )?;
            }
            ActivityItem::Follow {
                uuid,
                object,
                hidden_at,
            } => {
                let to_account = self.db.make_account_by_address(&object.address)?;
                self.db
                    .upsert_follow(sender.id, *uuid, to_account.id, *hidden_at)?;
            }
            ActivityItem::Like {
                uuid,
                object,
                hidden_at,
            } => {
                // The target may not have synced yet; leave the
                // reference null rather than failing.
                let message = self.db.get_message_by_uuid(object.uuid)?;
                self.db
                    .upsert_favorite(sender.id, *uuid, message.map(|m| m.id), *hidden_at)?;
            }
            ActivityItem::Unknown => {
                tracing::debug!("ignoring unrecognized activity item");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use numa_shared::activity::{AccountRef, MessageRef};
    use numa_shared::{Address, TxHash};
    use uuid::Uuid;

    fn setup() -> (Arc<Database>, BatchProcessor) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let processor = BatchProcessor::new(db.clone());
        (db, processor)
    }

    fn tx(hash_byte: u8, from_byte: u8) -> ChainTransaction {
        ChainTransaction {
            hash: TxHash([hash_byte; 32]),
            from: Address([from_byte; 20]),
            to: Some(Address([0xcc; 20])),
            input: Bytes::new(),
        }
    }

    fn doc(items: Vec<ActivityItem>) -> ActivityDocument {
        ActivityDocument {
            uuid: Uuid::new_v4(),
            items,
        }
    }

    #[test]
    fn mixed_document_applies_in_order() {
        let (db, processor) = setup();
        let note_uuid = Uuid::new_v4();
        let t = tx(1, 0xaa);

        let document = doc(vec![
            ActivityItem::Person {
                preferred_username: "Alice".into(),
                summary: Some("bio".into()),
                name: None,
                icon: None,
            },
            ActivityItem::Note {
                uuid: note_uuid,
                body: Some("first post".into()),
                hidden_at: None,
            },
            // Like targets the note created earlier in the same document.
            ActivityItem::Like {
                uuid: Uuid::new_v4(),
                object: MessageRef { uuid: note_uuid },
                hidden_at: None,
            },
        ]);

        db.record_transaction(&t, 1).unwrap();
        processor.process(&t, &document).unwrap();

        let sender = db.get_account_by_address(&t.from).unwrap().unwrap();
        assert_eq!(sender.username.as_deref(), Some("alice"));

        let favorites = db.list_favorites_for_account(sender.id).unwrap();
        assert_eq!(favorites.len(), 1);
        assert!(favorites[0].message_id.is_some());

        assert!(db.transaction_has_confirmed_batch(&t.hash).unwrap());
    }

    #[test]
    fn follow_creates_target_account_by_address() {
        let (db, processor) = setup();
        let target = Address([0xbb; 20]);
        let t = tx(1, 0xaa);
        db.record_transaction(&t, 1).unwrap();

        processor
            .process(
                &t,
                &doc(vec![ActivityItem::Follow {
                    uuid: Uuid::new_v4(),
                    object: AccountRef { address: target },
                    hidden_at: None,
                }]),
            )
            .unwrap();

        let followed = db.get_account_by_address(&target).unwrap().unwrap();
        assert!(!followed.confirmed);

        let sender = db.get_account_by_address(&t.from).unwrap().unwrap();
        let follows = db.list_follows_for_account(sender.id).unwrap();
        assert_eq!(follows.len(), 1);
        assert_eq!(follows[0].to_account_id, followed.id);
    }

    #[test]
    fn unknown_items_are_skipped() {
        let (db, processor) = setup();
        let t = tx(1, 0xaa);
        db.record_transaction(&t, 1).unwrap();

        processor
            .process(&t, &doc(vec![ActivityItem::Unknown]))
            .unwrap();
        assert!(db.transaction_has_confirmed_batch(&t.hash).unwrap());
    }

    #[test]
    fn redelivery_converges() {
        let (db, processor) = setup();
        let t = tx(1, 0xaa);
        db.record_transaction(&t, 1).unwrap();

        let document = doc(vec![ActivityItem::Note {
            uuid: Uuid::new_v4(),
            body: Some("once".into()),
            hidden_at: None,
        }]);

        processor.process(&t, &document).unwrap();
        processor.process(&t, &document).unwrap();

        let sender = db.get_account_by_address(&t.from).unwrap().unwrap();
        assert_eq!(db.list_messages_for_account(sender.id).unwrap().len(), 1);
        assert_eq!(db.count_batches_for_account(sender.id).unwrap(), 1);
    }
}
