//! SQL schema for the commish SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;

CREATE TABLE IF NOT EXISTS workbooks (
    workbook_id INTEGER PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS record_tables (
    table_id     INTEGER PRIMARY KEY,
    workbook_id  INTEGER NOT NULL REFERENCES workbooks(workbook_id),
    name         TEXT NOT NULL,
    columns_json TEXT NOT NULL,             -- JSON array of header names
    row_count    INTEGER NOT NULL DEFAULT 0,
    created_at   TEXT NOT NULL,
    UNIQUE (workbook_id, name)
);

-- Sparse: a missing cell reads as the empty string.
CREATE TABLE IF NOT EXISTS cells (
    table_id INTEGER NOT NULL REFERENCES record_tables(table_id),
    row_idx  INTEGER NOT NULL,
    col_idx  INTEGER NOT NULL,
    value    TEXT NOT NULL,
    PRIMARY KEY (table_id, row_idx, col_idx)
);

CREATE TABLE IF NOT EXISTS scheduled_actions (
    entry_id     TEXT PRIMARY KEY,       -- hex SHA-256 of action + target
    kind         TEXT NOT NULL,          -- 'lock_picks' | 'settle_scores' | 'advance_week'
    target_time  TEXT NOT NULL,          -- RFC 3339 UTC, fixed width
    payload_json TEXT NOT NULL,
    status       TEXT NOT NULL DEFAULT 'pending',
    created_at   TEXT NOT NULL,
    finished_at  TEXT,
    last_error   TEXT
);

CREATE INDEX IF NOT EXISTS scheduled_status_idx
    ON scheduled_actions(status, target_time);

PRAGMA user_version = 1;
";
