//! SQLite storage implementation.
//!
//! This module provides a SQLite-based implementation of the `Storage` trait.

use crate::state::UrlStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{PendingUrl, SessionStats, Storage, StorageError, StorageResult};
use crate::storage::{Session, SessionStatus, UrlRecord};
use crate::CrawlError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite storage backend.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new `SqliteStorage`, opening or creating the database file
    /// and applying the schema.
    pub fn new(path: &Path) -> Result<Self, CrawlError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database, for tests.
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, CrawlError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<Session> {
        let status_str: String = row.get(5)?;
        Ok(Session {
            id: row.get(0)?,
            seed_url: row.get(1)?,
            config_hash: row.get(2)?,
            started_at: row.get(3)?,
            completed_at: row.get(4)?,
            status: SessionStatus::from_db_string(&status_str).unwrap_or(SessionStatus::Running),
            pages_crawled: row.get::<_, i64>(6)? as u64,
            pages_failed: row.get::<_, i64>(7)? as u64,
        })
    }

    fn row_to_url_record(row: &rusqlite::Row) -> rusqlite::Result<UrlRecord> {
        let status_str: String = row.get(3)?;
        Ok(UrlRecord {
            id: row.get(0)?,
            session_id: row.get(1)?,
            url: row.get(2)?,
            status: UrlStatus::from_db_string(&status_str).unwrap_or(UrlStatus::Pending),
            http_status: row.get::<_, Option<i64>>(4)?.map(|v| v as u16),
            content_type: row.get(5)?,
            depth: row.get::<_, i64>(6)? as u32,
            parent_url: row.get(7)?,
            crawled_at: row.get(8)?,
            error: row.get(9)?,
        })
    }
}

const SESSION_COLUMNS: &str =
    "id, seed_url, config_hash, started_at, completed_at, status, pages_crawled, pages_failed";
const URL_COLUMNS: &str =
    "id, session_id, url, status, http_status, content_type, depth, parent_url, crawled_at, error";

impl Storage for SqliteStorage {
    fn create_session(&mut self, seed_url: &str, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO sessions (seed_url, config_hash, started_at, status)
             VALUES (?1, ?2, ?3, ?4)",
            params![seed_url, config_hash, now, SessionStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_session(&self, session_id: i64) -> StorageResult<Session> {
        let sql = format!("SELECT {} FROM sessions WHERE id = ?1", SESSION_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        stmt.query_row(params![session_id], Self::row_to_session)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StorageError::SessionNotFound(session_id),
                other => StorageError::Sqlite(other),
            })
    }

    fn get_latest_session(&self) -> StorageResult<Option<Session>> {
        let sql = format!(
            "SELECT {} FROM sessions ORDER BY id DESC LIMIT 1",
            SESSION_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let session = stmt.query_row([], Self::row_to_session).optional()?;
        Ok(session)
    }

    fn update_session(
        &mut self,
        session_id: i64,
        status: Option<SessionStatus>,
        pages_crawled: Option<u64>,
        pages_failed: Option<u64>,
    ) -> StorageResult<()> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(status) = status {
            clauses.push("status = ?".to_string());
            values.push(Box::new(status.to_db_string()));
            if matches!(status, SessionStatus::Completed | SessionStatus::Failed) {
                clauses.push("completed_at = ?".to_string());
                values.push(Box::new(Utc::now().to_rfc3339()));
            }
        }

        if let Some(pages_crawled) = pages_crawled {
            clauses.push("pages_crawled = ?".to_string());
            values.push(Box::new(pages_crawled as i64));
        }

        if let Some(pages_failed) = pages_failed {
            clauses.push("pages_failed = ?".to_string());
            values.push(Box::new(pages_failed as i64));
        }

        if clauses.is_empty() {
            return Ok(());
        }

        let sql = format!("UPDATE sessions SET {} WHERE id = ?", clauses.join(", "));
        values.push(Box::new(session_id));

        let params: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        self.conn.execute(&sql, params.as_slice())?;
        Ok(())
    }

    fn add_url(
        &mut self,
        session_id: i64,
        url: &str,
        depth: u32,
        parent_url: Option<&str>,
    ) -> StorageResult<bool> {
        let result = self.conn.execute(
            "INSERT INTO urls (session_id, url, depth, parent_url) VALUES (?1, ?2, ?3, ?4)",
            params![session_id, url, depth, parent_url],
        );

        match result {
            Ok(_) => Ok(true),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Ok(false)
            }
            Err(e) => Err(StorageError::Sqlite(e)),
        }
    }

    fn mark_url_crawled(
        &mut self,
        session_id: i64,
        url: &str,
        http_status: Option<u16>,
        content_type: Option<&str>,
        error: Option<&str>,
    ) -> StorageResult<()> {
        let status = if error.is_some() {
            UrlStatus::Failed
        } else {
            UrlStatus::Completed
        };
        let now = Utc::now().to_rfc3339();

        self.conn.execute(
            "UPDATE urls SET status = ?1, http_status = ?2, content_type = ?3,
                crawled_at = ?4, error = ?5
             WHERE session_id = ?6 AND url = ?7",
            params![
                status.to_db_string(),
                http_status.map(|v| v as i64),
                content_type,
                now,
                error,
                session_id,
                url
            ],
        )?;
        Ok(())
    }

    fn get_url(&self, session_id: i64, url: &str) -> StorageResult<Option<UrlRecord>> {
        let sql = format!(
            "SELECT {} FROM urls WHERE session_id = ?1 AND url = ?2",
            URL_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let record = stmt
            .query_row(params![session_id, url], Self::row_to_url_record)
            .optional()?;
        Ok(record)
    }

    fn get_pending_urls(&self, session_id: i64, limit: u32) -> StorageResult<Vec<PendingUrl>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, depth, parent_url FROM urls
             WHERE session_id = ?1 AND status = 'pending'
             ORDER BY depth ASC, id ASC LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![session_id, limit], |row| {
            Ok(PendingUrl {
                url: row.get(0)?,
                depth: row.get::<_, i64>(1)? as u32,
                parent_url: row.get(2)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn get_session_stats(&self, session_id: i64) -> StorageResult<SessionStats> {
        let (total, completed, failed, pending): (i64, i64, i64, i64) = self.conn.query_row(
            "SELECT
                COUNT(*),
                SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END),
                SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END),
                SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END)
             FROM urls WHERE session_id = ?1",
            params![session_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

        Ok(SessionStats {
            total: total as u64,
            completed: completed as u64,
            failed: failed as u64,
            pending: pending as u64,
        })
    }

    fn count_urls_by_status(&self, session_id: i64, status: UrlStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM urls WHERE session_id = ?1 AND status = ?2",
            params![session_id, status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_unique_hosts(&self, session_id: i64) -> StorageResult<u64> {
        let mut stmt = self
            .conn
            .prepare("SELECT url FROM urls WHERE session_id = ?1")?;
        let rows = stmt.query_map(params![session_id], |row| row.get::<_, String>(0))?;

        let mut hosts = std::collections::HashSet::new();
        for row in rows {
            let url = row?;
            if let Ok(parsed) = ::url::Url::parse(&url) {
                if let Some(host) = parsed.host_str() {
                    hosts.insert(host.to_lowercase());
                }
            }
        }
        Ok(hosts.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_get_session() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let id = storage
            .create_session("https://example.com/", "abc123")
            .unwrap();
        let session = storage.get_session(id).unwrap();
        assert_eq!(session.seed_url, "https://example.com/");
        assert_eq!(session.status, SessionStatus::Running);
        assert_eq!(session.pages_crawled, 0);
    }

    #[test]
    fn test_get_latest_session() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.create_session("https://a.test/", "h1").unwrap();
        let second = storage.create_session("https://b.test/", "h2").unwrap();

        let latest = storage.get_latest_session().unwrap().unwrap();
        assert_eq!(latest.id, second);
        assert_eq!(latest.seed_url, "https://b.test/");
    }

    #[test]
    fn test_get_latest_session_empty() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert!(storage.get_latest_session().unwrap().is_none());
    }

    #[test]
    fn test_update_session_status_and_counters() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let id = storage.create_session("https://example.com/", "h").unwrap();

        storage
            .update_session(id, Some(SessionStatus::Completed), Some(5), Some(1))
            .unwrap();

        let session = storage.get_session(id).unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.pages_crawled, 5);
        assert_eq!(session.pages_failed, 1);
        assert!(session.completed_at.is_some());
    }

    #[test]
    fn test_add_url_idempotent() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let id = storage.create_session("https://example.com/", "h").unwrap();

        assert!(storage
            .add_url(id, "https://example.com/", 0, None)
            .unwrap());
        assert!(!storage
            .add_url(id, "https://example.com/", 0, None)
            .unwrap());
    }

    #[test]
    fn test_mark_url_crawled_success() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let id = storage.create_session("https://example.com/", "h").unwrap();
        storage
            .add_url(id, "https://example.com/", 0, None)
            .unwrap();

        storage
            .mark_url_crawled(id, "https://example.com/", Some(200), Some("text/html"), None)
            .unwrap();

        let record = storage
            .get_url(id, "https://example.com/")
            .unwrap()
            .unwrap();
        assert_eq!(record.status, UrlStatus::Completed);
        assert_eq!(record.http_status, Some(200));
        assert!(record.crawled_at.is_some());
    }

    #[test]
    fn test_mark_url_crawled_failure() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let id = storage.create_session("https://example.com/", "h").unwrap();
        storage
            .add_url(id, "https://example.com/x", 1, None)
            .unwrap();

        storage
            .mark_url_crawled(id, "https://example.com/x", None, None, Some("timeout"))
            .unwrap();

        let record = storage
            .get_url(id, "https://example.com/x")
            .unwrap()
            .unwrap();
        assert_eq!(record.status, UrlStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_get_pending_urls_ordered_by_depth() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let id = storage.create_session("https://example.com/", "h").unwrap();

        storage
            .add_url(id, "https://example.com/deep", 2, None)
            .unwrap();
        storage
            .add_url(id, "https://example.com/shallow", 0, None)
            .unwrap();
        storage
            .add_url(id, "https://example.com/mid", 1, None)
            .unwrap();

        let pending = storage.get_pending_urls(id, 10).unwrap();
        let depths: Vec<u32> = pending.iter().map(|p| p.depth).collect();
        assert_eq!(depths, vec![0, 1, 2]);
    }

    #[test]
    fn test_get_session_stats() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let id = storage.create_session("https://example.com/", "h").unwrap();

        storage.add_url(id, "https://example.com/a", 0, None).unwrap();
        storage.add_url(id, "https://example.com/b", 0, None).unwrap();
        storage.add_url(id, "https://example.com/c", 0, None).unwrap();

        storage
            .mark_url_crawled(id, "https://example.com/a", Some(200), None, None)
            .unwrap();
        storage
            .mark_url_crawled(id, "https://example.com/b", None, None, Some("err"))
            .unwrap();

        let stats = storage.get_session_stats(id).unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.pending, 1);
    }

    #[test]
    fn test_count_unique_hosts() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let id = storage.create_session("https://example.com/", "h").unwrap();

        storage.add_url(id, "https://example.com/a", 0, None).unwrap();
        storage.add_url(id, "https://example.com/b", 0, None).unwrap();
        storage.add_url(id, "https://other.test/x", 0, None).unwrap();

        assert_eq!(storage.count_unique_hosts(id).unwrap(), 2);
    }
}
