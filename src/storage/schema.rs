//! Database schema definitions
//!
//! This module contains the SQL schema for SQLite output databases.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    stop_reason TEXT,
    accepted INTEGER NOT NULL DEFAULT 0,
    failures INTEGER NOT NULL DEFAULT 0,
    duplicates INTEGER NOT NULL DEFAULT 0,
    pages_visited INTEGER NOT NULL DEFAULT 0
);

-- One row per accepted listing
CREATE TABLE IF NOT EXISTS listings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    dedup_key TEXT NOT NULL,
    house_id TEXT,
    title TEXT NOT NULL,
    rental_mode TEXT NOT NULL,
    officially_verified INTEGER NOT NULL,
    anxuan_selected INTEGER NOT NULL,
    price INTEGER NOT NULL,
    deposit TEXT,
    area REAL NOT NULL,
    layout TEXT NOT NULL,
    community TEXT,
    detail_url TEXT NOT NULL,
    floor TEXT,
    orientation TEXT,
    decoration TEXT,
    phone TEXT,
    contact_name TEXT,
    company TEXT,
    agent_info TEXT,
    overview TEXT,
    facilities TEXT NOT NULL,
    updated_at TEXT,
    crawled_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_listings_dedup_key ON listings(dedup_key);
CREATE INDEX IF NOT EXISTS idx_listings_run ON listings(run_id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
