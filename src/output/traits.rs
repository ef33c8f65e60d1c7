//! Output types shared by the `--stats` and `--export-summary` CLI modes.
//!
//! Both modes read an existing database through the [`crate::storage::Storage`]
//! trait's query surface; neither performs any crawl logic.

use crate::storage::{Session, SessionStatus};
use thiserror::Error;

/// Errors that can occur while generating or writing a summary.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    #[error("No crawl session found in database")]
    NoSession,
}

/// Result type for output operations.
pub type OutputResult<T> = Result<T, OutputError>;

/// Aggregate statistics for one crawl session, assembled from the
/// session/URL state store for the `--stats` and `--export-summary` modes.
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub session_id: i64,
    pub seed_url: String,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub status: SessionStatus,
    pub config_hash: String,

    pub total_urls: u64,
    pub completed: u64,
    pub failed: u64,
    pub pending: u64,
    pub unique_hosts: u64,
}

impl CrawlSummary {
    /// Returns the success rate (completed / terminal) as a percentage.
    /// `0.0` if no URL has reached a terminal state yet.
    pub fn success_rate(&self) -> f64 {
        let terminal = self.completed + self.failed;
        if terminal == 0 {
            return 0.0;
        }
        (self.completed as f64 / terminal as f64) * 100.0
    }

    /// Returns the failure rate (failed / terminal) as a percentage.
    pub fn error_rate(&self) -> f64 {
        let terminal = self.completed + self.failed;
        if terminal == 0 {
            return 0.0;
        }
        (self.failed as f64 / terminal as f64) * 100.0
    }
}

impl From<Session> for CrawlSummary {
    /// Seeds a summary from a session row; caller fills in the
    /// URL-table-derived counts (`total_urls`, `unique_hosts`, ...).
    fn from(session: Session) -> Self {
        Self {
            session_id: session.id,
            seed_url: session.seed_url,
            started_at: session.started_at,
            completed_at: session.completed_at,
            status: session.status,
            config_hash: session.config_hash,
            total_urls: 0,
            completed: 0,
            failed: 0,
            pending: 0,
            unique_hosts: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> CrawlSummary {
        CrawlSummary {
            session_id: 1,
            seed_url: "https://example.com/".to_string(),
            started_at: "2026-01-01T00:00:00Z".to_string(),
            completed_at: None,
            status: SessionStatus::Running,
            config_hash: "abc".to_string(),
            total_urls: 0,
            completed: 0,
            failed: 0,
            pending: 0,
            unique_hosts: 0,
        }
    }

    #[test]
    fn test_success_rate_zero_when_no_terminal_urls() {
        assert_eq!(summary().success_rate(), 0.0);
    }

    #[test]
    fn test_success_and_error_rate() {
        let mut s = summary();
        s.completed = 80;
        s.failed = 20;
        assert!((s.success_rate() - 80.0).abs() < 0.01);
        assert!((s.error_rate() - 20.0).abs() < 0.01);
    }
}
