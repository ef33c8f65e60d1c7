//! Storage module for persisting crawl data.
//!
//! This module handles all database operations for the crawler:
//! - SQLite session/URL state store (schema management, resumable sessions)
//! - Append-only JSONL content log

mod content_log;
mod schema;
mod sqlite;
mod traits;

pub use content_log::{ContentLog, ContentRecord};
pub use sqlite::SqliteStorage;
pub use traits::{PendingUrl, SessionStats, Storage, StorageError};

use crate::CrawlError;
use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, CrawlError> {
    SqliteStorage::new(path)
}

/// A crawl session: one run from a seed URL through completion or failure.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: i64,
    pub seed_url: String,
    pub config_hash: String,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub status: SessionStatus,
    pub pages_crawled: u64,
    pub pages_failed: u64,
}

/// Status of a crawl session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Running,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A single URL's durable record within a session.
#[derive(Debug, Clone)]
pub struct UrlRecord {
    pub id: i64,
    pub session_id: i64,
    pub url: String,
    pub status: crate::state::UrlStatus,
    pub http_status: Option<u16>,
    pub content_type: Option<String>,
    pub depth: u32,
    pub parent_url: Option<String>,
    pub crawled_at: Option<String>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_status_roundtrip() {
        for status in [
            SessionStatus::Running,
            SessionStatus::Completed,
            SessionStatus::Failed,
        ] {
            let db_str = status.to_db_string();
            assert_eq!(Some(status), SessionStatus::from_db_string(db_str));
        }
    }

    #[test]
    fn test_session_status_invalid() {
        assert_eq!(SessionStatus::from_db_string("bogus"), None);
    }
}
