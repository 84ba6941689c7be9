// ==========================================
// School Import - SQLite connection setup
// ==========================================
// Goals:
// - one place for PRAGMA behavior, so every connection gets foreign keys
//   and busy_timeout instead of a per-module lottery
// - embedded schema DDL so tests and fresh installs share one definition
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// Default busy_timeout (milliseconds).
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Schema for the import pipeline tables.
///
/// `existing_entity` mirrors the natural keys of data already persisted in
/// the target modules; the uniqueness check in validation queries it.
/// Cascading deletes encode the ownership chain batch → file → record.
pub const SCHEMA_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS import_batch (
    batch_id        TEXT PRIMARY KEY,
    tenant_id       TEXT NOT NULL,
    label           TEXT NOT NULL,
    total_files     INTEGER NOT NULL DEFAULT 0,
    processed_files INTEGER NOT NULL DEFAULT 0,
    state           TEXT NOT NULL DEFAULT 'PENDING',
    created_at      TEXT NOT NULL,
    finished_at     TEXT,
    confirmed_at    TEXT,
    CHECK (processed_files <= total_files)
);

CREATE TABLE IF NOT EXISTS import_file (
    file_id       TEXT PRIMARY KEY,
    batch_id      TEXT NOT NULL REFERENCES import_batch(batch_id) ON DELETE CASCADE,
    tenant_id     TEXT NOT NULL,
    file_name     TEXT NOT NULL,
    stored_path   TEXT NOT NULL,
    mime_type     TEXT NOT NULL,
    state         TEXT NOT NULL DEFAULT 'PENDING',
    module        TEXT,
    confidence    REAL NOT NULL DEFAULT 0.0,
    total_rows    INTEGER NOT NULL DEFAULT 0,
    valid_rows    INTEGER NOT NULL DEFAULT 0,
    invalid_rows  INTEGER NOT NULL DEFAULT 0,
    elapsed_ms    INTEGER,
    error_message TEXT,
    error_origin  TEXT,
    created_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_import_file_batch ON import_file(batch_id);

CREATE TABLE IF NOT EXISTS import_record (
    record_id        TEXT PRIMARY KEY,
    file_id          TEXT NOT NULL REFERENCES import_file(file_id) ON DELETE CASCADE,
    tenant_id        TEXT NOT NULL,
    row_number       INTEGER NOT NULL,
    raw_data         TEXT NOT NULL,
    mapped_data      TEXT NOT NULL,
    state            TEXT NOT NULL,
    errors           TEXT NOT NULL DEFAULT '[]',
    warnings         TEXT NOT NULL DEFAULT '[]',
    suggested_action TEXT NOT NULL,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL,
    UNIQUE (file_id, row_number)
);

CREATE INDEX IF NOT EXISTS idx_import_record_file ON import_record(file_id, state);

CREATE TABLE IF NOT EXISTS existing_entity (
    tenant_id   TEXT NOT NULL,
    module      TEXT NOT NULL,
    natural_key TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    PRIMARY KEY (tenant_id, module, natural_key)
);
"#;

/// Apply the unified PRAGMA set.
///
/// foreign_keys and busy_timeout are per-connection settings and must be
/// re-applied on every open.
pub fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// Open a connection with unified PRAGMAs applied.
pub fn open_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_connection(&conn)?;
    Ok(conn)
}

/// Open a connection and create the import tables if missing.
pub fn open_and_migrate(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = open_connection(db_path)?;
    conn.execute_batch(SCHEMA_DDL)?;
    Ok(conn)
}
