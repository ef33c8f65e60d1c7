//! Per-domain robots.txt cache with 24-hour staleness.

use crate::robots::ParsedRobots;
use chrono::{DateTime, Duration, Utc};

/// Cached robots.txt data for a domain.
#[derive(Debug, Clone)]
pub struct CachedRobots {
    pub content: ParsedRobots,
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    pub fn new(content: ParsedRobots) -> Self {
        Self {
            content,
            fetched_at: Utc::now(),
        }
    }

    /// Robots.txt is refetched once a cached copy is older than 24 hours.
    pub fn is_stale(&self) -> bool {
        let age = Utc::now() - self.fetched_at;
        age > Duration::hours(24)
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.fetched_at
    }

    pub fn is_allowed(&self, path: &str) -> bool {
        self.content.is_allowed(path)
    }

    pub fn crawl_delay(&self) -> Option<f64> {
        self.content.crawl_delay()
    }

    pub fn sitemaps(&self) -> &[String] {
        self.content.sitemaps()
    }
}
