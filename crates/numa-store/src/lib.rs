//! # numa-store
//!
//! Local SQLite persistence for the indexed domain model: accounts,
//! messages, follows, favorites, batches, on-chain transactions, and the
//! named checkpoint slot the sync engine resumes from.
//!
//! Every write helper is an idempotent upsert keyed by the entity's
//! unique key, because the sync engine may redeliver a document after a
//! crash and must converge on the same end state.

pub mod accounts;
pub mod batches;
pub mod checkpoint;
pub mod database;
pub mod favorites;
pub mod follows;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod transactions;

mod error;

pub use accounts::AccountProfile;
pub use database::Database;
pub use error::StoreError;
pub use messages::MessageUpsert;
pub use models::*;
