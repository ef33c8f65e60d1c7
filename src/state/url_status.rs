//! URL status tracking.
//!
//! A crawled URL moves through exactly three states: queued but not yet
//! fetched, fetched and processed, or permanently failed. There is no
//! in-between "fetching" state recorded durably — in-flight dispatch lives
//! only in the frontier's in-memory set.
use std::fmt;

/// Terminal (or pending) status of a URL within a session's URL table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlStatus {
    /// Added to the session but not yet crawled.
    Pending,
    /// Fetched and processed successfully.
    Completed,
    /// Fetch or processing failed; will not be retried within this session.
    Failed,
}

impl UrlStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for UrlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!UrlStatus::Pending.is_terminal());
        assert!(UrlStatus::Completed.is_terminal());
        assert!(UrlStatus::Failed.is_terminal());
    }

    #[test]
    fn test_roundtrip_db_string() {
        for state in [UrlStatus::Pending, UrlStatus::Completed, UrlStatus::Failed] {
            let db_str = state.to_db_string();
            assert_eq!(Some(state), UrlStatus::from_db_string(db_str));
        }
        assert_eq!(UrlStatus::from_db_string("bogus"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", UrlStatus::Pending), "pending");
        assert_eq!(format!("{}", UrlStatus::Completed), "completed");
        assert_eq!(format!("{}", UrlStatus::Failed), "failed");
    }
}
