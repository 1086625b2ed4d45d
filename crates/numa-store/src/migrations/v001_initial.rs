//! v001 -- Initial schema creation.
//!
//! Creates the seven core tables: `accounts`, `messages`, `follows`,
//! `favorites`, `batches`, `transactions`, and `sync_state`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Accounts
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS accounts (
    id             TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    address        TEXT NOT NULL UNIQUE,       -- lower-case 0x-prefixed hex
    username       TEXT,                       -- unique case-insensitively
    bio            TEXT,
    display_name   TEXT,
    avatar_address TEXT,                       -- content address of avatar
    confirmed      INTEGER NOT NULL DEFAULT 0, -- boolean 0/1
    created_at     TEXT NOT NULL               -- ISO-8601 / RFC-3339
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_accounts_username
    ON accounts(lower(username)) WHERE username IS NOT NULL;

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id          TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    account_id  TEXT NOT NULL,                 -- FK -> accounts(id)
    uuid        TEXT NOT NULL,                 -- publisher-assigned
    json_schema TEXT NOT NULL,                 -- 'micro' | 'article'
    body        TEXT,
    title       TEXT,
    tldr        TEXT,
    hidden_at   TEXT,
    confirmed   INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL,

    UNIQUE (account_id, uuid),
    FOREIGN KEY (account_id) REFERENCES accounts(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_messages_uuid ON messages(uuid);

-- ----------------------------------------------------------------
-- Follows
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS follows (
    id              TEXT PRIMARY KEY NOT NULL, -- UUID v4
    from_account_id TEXT NOT NULL,             -- FK -> accounts(id)
    uuid            TEXT NOT NULL,
    to_account_id   TEXT NOT NULL,             -- FK -> accounts(id)
    hidden_at       TEXT,
    confirmed       INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL,

    UNIQUE (from_account_id, uuid),
    FOREIGN KEY (from_account_id) REFERENCES accounts(id) ON DELETE CASCADE,
    FOREIGN KEY (to_account_id)   REFERENCES accounts(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Favorites
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS favorites (
    id              TEXT PRIMARY KEY NOT NULL, -- UUID v4
    from_account_id TEXT NOT NULL,             -- FK -> accounts(id)
    uuid            TEXT NOT NULL,
    message_id      TEXT,                      -- nullable FK -> messages(id)
    hidden_at       TEXT,
    confirmed       INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL,

    UNIQUE (from_account_id, uuid),
    FOREIGN KEY (from_account_id) REFERENCES accounts(id) ON DELETE CASCADE,
    FOREIGN KEY (message_id)      REFERENCES messages(id) ON DELETE SET NULL
);

-- ----------------------------------------------------------------
-- Batches
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS batches (
    id         TEXT PRIMARY KEY NOT NULL,      -- UUID v4
    uuid       TEXT NOT NULL,                  -- document UUID once adopted
    account_id TEXT NOT NULL,                  -- FK -> accounts(id)
    status     TEXT NOT NULL DEFAULT 'pending',-- 'pending' | 'confirmed'
    created_at TEXT NOT NULL,

    UNIQUE (uuid, account_id),
    FOREIGN KEY (account_id) REFERENCES accounts(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_batches_account_status
    ON batches(account_id, status);

-- ----------------------------------------------------------------
-- Transactions
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS transactions (
    hash         TEXT PRIMARY KEY NOT NULL,    -- 0x-prefixed hex
    block_number INTEGER NOT NULL,
    from_address TEXT NOT NULL,
    to_address   TEXT,                         -- null for contract creation
    input        BLOB NOT NULL,
    batch_id     TEXT,                         -- nullable FK -> batches(id)
    created_at   TEXT NOT NULL,

    FOREIGN KEY (batch_id) REFERENCES batches(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_transactions_to_block
    ON transactions(to_address, block_number);

-- ----------------------------------------------------------------
-- Sync state (named key/value slots, e.g. the block checkpoint)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS sync_state (
    key   TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
