//! SQLite output sink
//!
//! Each run inserts a `runs` row when the sink opens and completes it with
//! the final counts in `finish`; accepted listings go to `listings`.

use crate::extract::{RecordField, ValidatedRecord};
use crate::output::{CrawlSummary, RecordSink, SinkResult};
use crate::storage::schema::initialize_schema;
use crate::storage::RunStatus;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::path::Path;

/// SQLite sink with run bookkeeping
pub struct SqliteSink {
    conn: Connection,
    run_id: i64,
}

impl SqliteSink {
    /// Opens (or creates) the database at `path` and starts a run
    pub fn open(path: &Path, config_hash: &str) -> SinkResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        Self::with_connection(conn, config_hash)
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory(config_hash: &str) -> SinkResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::with_connection(conn, config_hash)
    }

    fn with_connection(conn: Connection, config_hash: &str) -> SinkResult<Self> {
        initialize_schema(&conn)?;

        conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![
                Utc::now().to_rfc3339(),
                config_hash,
                RunStatus::Running.to_db_string()
            ],
        )?;
        let run_id = conn.last_insert_rowid();

        tracing::debug!(run_id, "SQLite run started");
        Ok(Self { conn, run_id })
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// Number of listings stored by any run
    pub fn listing_count(&self) -> SinkResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM listings", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl RecordSink for SqliteSink {
    fn write(&mut self, record: &ValidatedRecord) -> SinkResult<()> {
        let record = record.record();
        let text = |field| record.value(field);

        self.conn.execute(
            "INSERT INTO listings (
                run_id, dedup_key, house_id, title, rental_mode, officially_verified,
                anxuan_selected, price, deposit, area, layout, community, detail_url,
                floor, orientation, decoration, phone, contact_name, company, agent_info,
                overview, facilities, updated_at, crawled_at
             ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24
             )",
            params![
                self.run_id,
                record.dedup_key(),
                record.house_id,
                record.title,
                text(RecordField::RentalMode),
                record.officially_verified,
                record.anxuan_selected,
                record.price,
                record.deposit,
                record.area,
                record.layout,
                record.community,
                record.detail_url,
                record.floor,
                record.orientation,
                record.decoration,
                record.phone,
                record.contact_name,
                record.company,
                record.agent_info,
                record.overview,
                text(RecordField::Facilities),
                record.updated_at,
                text(RecordField::CrawledAt),
            ],
        )?;

        Ok(())
    }

    fn known_keys(&mut self) -> SinkResult<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT DISTINCT dedup_key FROM listings")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(keys)
    }

    fn finish(&mut self, summary: &CrawlSummary) -> SinkResult<()> {
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, stop_reason = ?3,
             accepted = ?4, failures = ?5, duplicates = ?6, pages_visited = ?7
             WHERE id = ?8",
            params![
                RunStatus::Completed.to_db_string(),
                Utc::now().to_rfc3339(),
                summary.stop_reason.as_str(),
                summary.accepted as i64,
                summary.failures as i64,
                summary.duplicates as i64,
                summary.pages_visited as i64,
                self.run_id
            ],
        )?;
        Ok(())
    }
}
