//! The `--export-summary` CLI mode: a Markdown report rendered from an
//! existing (completed or in-progress) database.

use crate::output::stats::load_statistics;
use crate::output::traits::{CrawlSummary, OutputResult};
use crate::storage::Storage;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Loads the latest session's summary from `storage`, for the
/// `--export-summary` CLI mode.
pub fn generate_summary(storage: &dyn Storage) -> OutputResult<CrawlSummary> {
    load_statistics(storage)
}

/// Renders `summary` as Markdown and writes it to `output_path`.
pub fn generate_markdown_summary(summary: &CrawlSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);
    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;
    Ok(())
}

/// Formats a crawl summary as a Markdown report.
pub fn format_markdown_summary(summary: &CrawlSummary) -> String {
    let mut md = String::new();

    md.push_str("# Crawl Summary\n\n");

    md.push_str("## Session\n\n");
    md.push_str(&format!("- **Session ID**: {}\n", summary.session_id));
    md.push_str(&format!("- **Seed URL**: {}\n", summary.seed_url));
    md.push_str(&format!("- **Started**: {}\n", summary.started_at));
    if let Some(completed_at) = &summary.completed_at {
        md.push_str(&format!("- **Completed**: {}\n", completed_at));
    }
    md.push_str(&format!("- **Status**: {:?}\n", summary.status));
    md.push_str(&format!("- **Config hash**: {}\n\n", summary.config_hash));

    md.push_str("## URL Table\n\n");
    md.push_str("| Status | Count |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Completed | {} |\n", summary.completed));
    md.push_str(&format!("| Failed | {} |\n", summary.failed));
    md.push_str(&format!("| Pending | {} |\n", summary.pending));
    md.push_str(&format!("| **Total** | **{}** |\n\n", summary.total_urls));

    md.push_str("## Overview\n\n");
    md.push_str(&format!("- **Unique hosts**: {}\n", summary.unique_hosts));
    md.push_str(&format!(
        "- **Success rate**: {:.2}%\n",
        summary.success_rate()
    ));
    md.push_str(&format!("- **Error rate**: {:.2}%\n", summary.error_rate()));

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SessionStatus;

    fn test_summary() -> CrawlSummary {
        CrawlSummary {
            session_id: 1,
            seed_url: "https://example.com/".to_string(),
            started_at: "2026-01-01T00:00:00Z".to_string(),
            completed_at: Some("2026-01-01T01:00:00Z".to_string()),
            status: SessionStatus::Completed,
            config_hash: "abc123".to_string(),
            total_urls: 1000,
            completed: 900,
            failed: 100,
            pending: 0,
            unique_hosts: 50,
        }
    }

    #[test]
    fn test_format_markdown_summary_includes_headings() {
        let markdown = format_markdown_summary(&test_summary());
        assert!(markdown.contains("# Crawl Summary"));
        assert!(markdown.contains("## Session"));
        assert!(markdown.contains("## URL Table"));
    }

    #[test]
    fn test_markdown_contains_counts() {
        let markdown = format_markdown_summary(&test_summary());
        assert!(markdown.contains("900"));
        assert!(markdown.contains("100"));
        assert!(markdown.contains("50"));
    }

    #[test]
    fn test_generate_markdown_summary_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.md");
        generate_markdown_summary(&test_summary(), &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Crawl Summary"));
    }
}
