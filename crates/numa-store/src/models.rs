//! Domain model structs persisted in the local SQLite database.
//!
//! Every struct derives `Serialize` so it can be handed directly to a
//! presentation layer; the store itself only reads and writes rows.

use chrono::{DateTime, Utc};
use numa_shared::{Address, TxHash};
use serde::Serialize;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// An on-chain account.  Created lazily by address; the profile fields
/// fill in once a `Person` item for the account syncs.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Account {
    /// Local primary key.
    pub id: Uuid,
    /// Deterministic on-chain address, stored lower-case hex.
    pub address: Address,
    /// Unique username (case-insensitive), absent until the profile syncs.
    pub username: Option<String>,
    pub bio: Option<String>,
    pub display_name: Option<String>,
    /// Content address of the avatar image, as published.
    pub avatar_address: Option<String>,
    /// Set once any on-chain activity for the account confirms.
    pub confirmed: bool,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Message schema variant: short-form micro posts and long-form articles.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageSchema {
    Micro,
    Article,
}

impl MessageSchema {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Micro => "micro",
            Self::Article => "article",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "micro" => Some(Self::Micro),
            "article" => Some(Self::Article),
            _ => None,
        }
    }
}

/// A published message, unique per (account, uuid).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub account_id: Uuid,
    /// Publisher-assigned identifier, the upsert key within the account.
    pub uuid: Uuid,
    pub schema: MessageSchema,
    pub body: Option<String>,
    /// Article title (`name` in the published document).
    pub title: Option<String>,
    /// Article summary.
    pub tldr: Option<String>,
    pub hidden_at: Option<DateTime<Utc>>,
    pub confirmed: bool,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Follow
// ---------------------------------------------------------------------------

/// A follow edge, unique per (from-account, uuid).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Follow {
    pub id: Uuid,
    pub from_account_id: Uuid,
    pub uuid: Uuid,
    pub to_account_id: Uuid,
    pub hidden_at: Option<DateTime<Utc>>,
    pub confirmed: bool,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Favorite
// ---------------------------------------------------------------------------

/// A favorite, unique per (from-account, uuid).  The referenced message
/// may not have synced yet, in which case `message_id` stays null.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Favorite {
    pub id: Uuid,
    pub from_account_id: Uuid,
    pub uuid: Uuid,
    pub message_id: Option<Uuid>,
    pub hidden_at: Option<DateTime<Utc>>,
    pub confirmed: bool,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// Batch lifecycle: pending until its transaction confirms on chain.
/// The confirmed state is terminal.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    Confirmed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            _ => None,
        }
    }
}

/// The unit of confirmation tying one or more transactions to the
/// domain-model effects of one activity document.  De-duplicated by
/// (uuid, account).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Batch {
    pub id: Uuid,
    /// Document UUID once associated; a fresh value for a pending batch
    /// that has not been matched to a document yet.
    pub uuid: Uuid,
    pub account_id: Uuid,
    pub status: BatchStatus,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// TxRecord
// ---------------------------------------------------------------------------

/// An on-chain transaction observed by the indexer.  `batch_id` is the
/// "transactable" association: set at most once, and a transaction whose
/// batch is already confirmed is never reprocessed.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TxRecord {
    pub hash: TxHash,
    pub block_number: u64,
    pub from_address: Address,
    pub to_address: Option<Address>,
    #[serde(skip)]
    pub input: Vec<u8>,
    pub batch_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
