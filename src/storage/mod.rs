//! Storage module for SQLite output
//!
//! This module handles the database side of the output layer:
//! - SQLite database initialization and schema management
//! - Listing persistence
//! - Run tracking (start, finish, final counts)

mod schema;
mod sqlite;

pub use sqlite::SqliteSink;

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}
