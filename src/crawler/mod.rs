//! The crawl engine: URL frontier, HTTP fetcher, rate limiter, identity
//! provider, sitemap expander, HTML extractor, and the orchestrator/worker
//! pool that wires them together.

mod coordinator;
mod fetcher;
pub mod frontier;
pub mod identity;
mod parser;
pub mod rate_limiter;
pub mod sitemap;

pub use coordinator::{CrawlOutcome, Coordinator};
pub use fetcher::{FetchErrorKind, FetchResult, Fetcher};
pub use frontier::{Frontier, Priority, UrlItem};
pub use identity::IdentityProvider;
pub use parser::{get_crawlable_links, parse, ExtractedLink, LinkKind, ParsedPage};
pub use rate_limiter::RateLimiter;

use crate::config::{load_config_with_hash, Config};
use crate::CrawlError;
use std::path::Path;
use std::sync::Arc;

/// Runs a complete crawl from a loaded configuration: opens persistence,
/// creates or resumes a session, discovers sitemaps, and drives the worker
/// pool to completion.
///
/// This is the library's sole entry point for crawling; the CLI binary
/// (out of scope per the core's own framing) is a thin caller of it.
pub async fn crawl(config: Config, config_hash: String, resume: bool) -> Result<CrawlOutcome, CrawlError> {
    let coordinator = Arc::new(Coordinator::new(config, config_hash, resume).await?);

    let shutdown = coordinator.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received, finishing in-flight work");
            shutdown.store(true, std::sync::atomic::Ordering::Relaxed);
        }
    });

    coordinator.run().await
}

/// Loads a configuration file and runs a crawl in one step.
pub async fn run_crawl(config_path: &Path, resume: bool) -> Result<CrawlOutcome, CrawlError> {
    let (config, config_hash) = load_config_with_hash(config_path)?;
    crawl(config, config_hash, resume).await
}
