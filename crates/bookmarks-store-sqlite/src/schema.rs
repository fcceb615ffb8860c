//! SQL schema for the Bookmarks SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Users are deactivated, never deleted.
CREATE TABLE IF NOT EXISTS users (
    user_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT    NOT NULL UNIQUE,
    password_hash TEXT    NOT NULL,
    first_name    TEXT    NOT NULL DEFAULT '',
    last_name     TEXT    NOT NULL DEFAULT '',
    email         TEXT    NOT NULL DEFAULT '',   -- '' when not supplied
    is_active     INTEGER NOT NULL DEFAULT 1,
    is_staff      INTEGER NOT NULL DEFAULT 0,
    date_joined   TEXT    NOT NULL,              -- RFC 3339 UTC, microseconds
    last_login    TEXT
);

CREATE UNIQUE INDEX IF NOT EXISTS users_email_idx
    ON users(lower(email)) WHERE email != '';

-- Exactly one row per user, written in the same transaction as the user.
CREATE TABLE IF NOT EXISTS profiles (
    user_id       INTEGER PRIMARY KEY REFERENCES users(user_id) ON DELETE CASCADE,
    date_of_birth TEXT,                          -- YYYY-MM-DD
    photo         TEXT,                          -- relative to media_dir
    bio           TEXT    NOT NULL DEFAULT ''
);

-- Directed follow edges; at most one per ordered pair.
CREATE TABLE IF NOT EXISTS contacts (
    user_from  INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    user_to    INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    created_at TEXT    NOT NULL,
    PRIMARY KEY (user_from, user_to),
    CHECK (user_from != user_to)
);

-- Actions are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS actions (
    action_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(user_id),
    verb        TEXT    NOT NULL,
    target_kind TEXT,                            -- 'user' | NULL
    target_id   INTEGER,
    created_at  TEXT    NOT NULL,
    CHECK ((target_kind IS NULL) = (target_id IS NULL))
);

-- Only the SHA-256 digest of a session token is stored.
CREATE TABLE IF NOT EXISTS sessions (
    token_hash TEXT    PRIMARY KEY,
    user_id    INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    created_at TEXT    NOT NULL,
    expires_at TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS contacts_to_idx      ON contacts(user_to);
CREATE INDEX IF NOT EXISTS actions_created_idx  ON actions(created_at);
CREATE INDEX IF NOT EXISTS actions_user_idx     ON actions(user_id, created_at);
CREATE INDEX IF NOT EXISTS sessions_user_idx    ON sessions(user_id);

PRAGMA user_version = 1;
";
