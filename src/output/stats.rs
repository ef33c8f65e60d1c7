//! The `--stats` CLI mode: aggregate counts from an existing database,
//! printed without crawling.

use crate::output::traits::{CrawlSummary, OutputError, OutputResult};
use crate::storage::Storage;

/// Loads the latest session's aggregate statistics from `storage`.
pub fn load_statistics(storage: &dyn Storage) -> OutputResult<CrawlSummary> {
    let session = storage
        .get_latest_session()?
        .ok_or(OutputError::NoSession)?;
    let session_id = session.id;

    let stats = storage.get_session_stats(session_id)?;
    let unique_hosts = storage.count_unique_hosts(session_id)?;

    let mut summary = CrawlSummary::from(session);
    summary.total_urls = stats.total;
    summary.completed = stats.completed;
    summary.failed = stats.failed;
    summary.pending = stats.pending;
    summary.unique_hosts = unique_hosts;

    Ok(summary)
}

/// Prints a human-readable statistics report to stdout.
pub fn print_statistics(summary: &CrawlSummary) {
    println!("Session #{}: {}", summary.session_id, summary.seed_url);
    println!("  Status:        {:?}", summary.status);
    println!("  Started:       {}", summary.started_at);
    if let Some(completed_at) = &summary.completed_at {
        println!("  Completed:     {}", completed_at);
    }
    println!();
    println!("  Total URLs:    {}", summary.total_urls);
    println!("  Completed:     {}", summary.completed);
    println!("  Failed:        {}", summary.failed);
    println!("  Pending:       {}", summary.pending);
    println!("  Unique hosts:  {}", summary.unique_hosts);
    println!();
    println!("  Success rate:  {:.2}%", summary.success_rate());
    println!("  Error rate:    {:.2}%", summary.error_rate());
}
