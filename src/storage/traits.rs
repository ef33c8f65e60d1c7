//! Storage trait and associated error/result types.

use crate::state::UrlStatus;
use crate::storage::{Session, SessionStatus, UrlRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Session not found: {0}")]
    SessionNotFound(i64),

    #[error("URL not found: {0}")]
    UrlNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A pending URL reloaded from a previous session on resume.
#[derive(Debug, Clone)]
pub struct PendingUrl {
    pub url: String,
    pub depth: u32,
    pub parent_url: Option<String>,
}

/// Aggregate statistics for a session's URL table.
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    pub total: u64,
    pub completed: u64,
    pub failed: u64,
    pub pending: u64,
}

/// Trait for session/URL state store backend implementations.
///
/// Implementations should provide thread-safe access to the underlying
/// storage; the orchestrator serializes writes through a single connection.
pub trait Storage {
    /// Creates a new crawl session, returning its id.
    fn create_session(&mut self, seed_url: &str, config_hash: &str) -> StorageResult<i64>;

    /// Gets a session by id.
    fn get_session(&self, session_id: i64) -> StorageResult<Session>;

    /// Gets the most recently created session, if any.
    fn get_latest_session(&self) -> StorageResult<Option<Session>>;

    /// Updates session status and/or counters. Passing `None` for a field
    /// leaves it unchanged. Transitioning to `Completed` or `Failed` stamps
    /// `completed_at`.
    fn update_session(
        &mut self,
        session_id: i64,
        status: Option<SessionStatus>,
        pages_crawled: Option<u64>,
        pages_failed: Option<u64>,
    ) -> StorageResult<()>;

    /// Adds a URL to a session's URL table. Idempotent: returns `false` if
    /// the (session, url) pair already exists rather than erroring.
    fn add_url(
        &mut self,
        session_id: i64,
        url: &str,
        depth: u32,
        parent_url: Option<&str>,
    ) -> StorageResult<bool>;

    /// Marks a URL as crawled (completed or failed, depending on `error`).
    fn mark_url_crawled(
        &mut self,
        session_id: i64,
        url: &str,
        http_status: Option<u16>,
        content_type: Option<&str>,
        error: Option<&str>,
    ) -> StorageResult<()>;

    /// Gets a URL's record within a session, if present.
    fn get_url(&self, session_id: i64, url: &str) -> StorageResult<Option<UrlRecord>>;

    /// Gets URLs still pending within a session, ordered by depth ascending
    /// then insertion order, for reload into the frontier on resume.
    fn get_pending_urls(&self, session_id: i64, limit: u32) -> StorageResult<Vec<PendingUrl>>;

    /// Aggregate counts of URLs by status within a session.
    fn get_session_stats(&self, session_id: i64) -> StorageResult<SessionStats>;

    /// Counts URLs with a given status within a session.
    fn count_urls_by_status(&self, session_id: i64, status: UrlStatus) -> StorageResult<u64>;

    /// Number of distinct hosts that appear among a session's URLs.
    fn count_unique_hosts(&self, session_id: i64) -> StorageResult<u64>;
}
