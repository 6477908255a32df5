//! Canonical SQLite schema for stockroom.
//!
//! - `items` holds descriptive item state only; position lives in history
//! - `item_history` is the append-only event log (triggers reject UPDATE and
//!   DELETE; `ON DELETE RESTRICT` keeps items with history from being purged)
//! - `locations` and `users` back the SQLite directory implementation
//! - `store_meta` tracks the applied schema version

/// Migration v1: core tables, append-only triggers and store metadata.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS users (
    user_id TEXT PRIMARY KEY,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    username TEXT NOT NULL UNIQUE CHECK (length(trim(username)) > 0),
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS locations (
    location_id TEXT PRIMARY KEY,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    description TEXT,
    is_deleted INTEGER NOT NULL DEFAULT 0 CHECK (is_deleted IN (0, 1)),
    is_user INTEGER NOT NULL DEFAULT 0 CHECK (is_user IN (0, 1)),
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS items (
    item_id TEXT PRIMARY KEY,
    identifier TEXT UNIQUE,
    reference TEXT NOT NULL CHECK (length(trim(reference)) > 0),
    group_key TEXT NOT NULL,
    description TEXT,
    deleted INTEGER NOT NULL DEFAULT 0 CHECK (deleted IN (0, 1)),
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS item_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    item_id TEXT NOT NULL REFERENCES items(item_id) ON DELETE RESTRICT,
    kind TEXT NOT NULL,
    data BLOB NOT NULL,
    created_at_us INTEGER NOT NULL
);

CREATE TRIGGER IF NOT EXISTS item_history_no_update
BEFORE UPDATE ON item_history
BEGIN
    SELECT RAISE(ABORT, 'item_history is append-only');
END;

CREATE TRIGGER IF NOT EXISTS item_history_no_delete
BEFORE DELETE ON item_history
BEGIN
    SELECT RAISE(ABORT, 'item_history is append-only');
END;

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL,
    created_at_us INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO store_meta (id, schema_version, created_at_us)
VALUES (1, 1, CAST((julianday('now') - 2440587.5) * 86400000000 AS INTEGER));
";

/// Migration v2: read-path indexes for history and listings.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_item_history_item_created
    ON item_history(item_id, created_at_us DESC, id DESC);

CREATE INDEX IF NOT EXISTS idx_item_history_item_kind_created
    ON item_history(item_id, kind, created_at_us DESC, id DESC);

CREATE INDEX IF NOT EXISTS idx_items_group
    ON items(group_key, deleted);

CREATE INDEX IF NOT EXISTS idx_items_deleted_created
    ON items(deleted, created_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_locations_deleted_name
    ON locations(is_deleted, name);

UPDATE store_meta
SET schema_version = 2
WHERE id = 1;
";

/// Indexes expected by history and listing query paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_item_history_item_created",
    "idx_item_history_item_kind_created",
    "idx_items_group",
    "idx_items_deleted_created",
    "idx_locations_deleted_name",
];
