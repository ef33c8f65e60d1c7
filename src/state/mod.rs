//! State module for tracking crawl progress.
//!
//! `UrlStatus` tracks the durable status of a single URL within a session.
//! Per-host rate limiting and robots caching live in `crawler::rate_limiter`
//! and `robots::cache` respectively, not here.

mod url_status;

pub use url_status::UrlStatus;
