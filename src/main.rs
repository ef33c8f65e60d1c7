//! Command-line entry point for the crawler.
//!
//! A thin `clap`-derived wrapper over the library's [`webcrawl_core::run_crawl`]
//! entry point. Contains no crawl logic of its own: `--dry-run`, `--stats`,
//! and `--export-summary` read configuration/database state and exit before
//! any worker is spawned.

use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use webcrawl_core::config::load_config_with_hash;

/// A polite, concurrent web crawler.
#[derive(Parser, Debug)]
#[command(name = "webcrawl")]
#[command(version = "1.0.0")]
#[command(about = "A polite, concurrent web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Resume an interrupted crawl (default behavior)
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Start a fresh crawl, ignoring previous session state
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "export_summary"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_summary"])]
    stats: bool,

    /// Generate a Markdown summary from existing data and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    export_summary: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!(path = %cli.config.display(), "loading configuration");
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            return Err(e.into());
        }
    };
    tracing::info!(hash = %config_hash, "configuration loaded");

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.export_summary {
        handle_export_summary(&config)?;
    } else {
        handle_crawl(&cli.config, config, config_hash, !cli.fresh).await?;
    }

    Ok(())
}

fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("webcrawl_core=info,warn"),
            1 => EnvFilter::new("webcrawl_core=debug,info"),
            2 => EnvFilter::new("webcrawl_core=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// `--dry-run`: validates config and prints what would be crawled.
fn handle_dry_run(config: &webcrawl_core::Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Dry Run ===\n");

    println!("Crawler configuration:");
    println!("  Max pages:           {}", config.crawler.max_pages);
    println!("  Max depth:           {}", config.crawler.max_depth);
    println!("  Max retries:         {}", config.crawler.max_retries);
    println!(
        "  Requests/sec (host): {}",
        config.crawler.requests_per_second
    );
    println!(
        "  Concurrent requests: {}",
        config.crawler.concurrent_requests
    );
    println!("  Respect robots.txt:  {}", config.crawler.respect_robots_txt);
    println!("  Respect nofollow:    {}", config.crawler.respect_nofollow);
    println!("  Parse sitemaps:      {}", config.crawler.parse_sitemaps);

    println!("\nIdentity:");
    println!("  Name:        {}", config.user_agent.name);
    println!("  Version:     {}", config.user_agent.version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Rotate UAs:  {}", config.user_agent.rotate);

    println!("\nOutput:");
    println!("  Output dir: {}", config.output.output_dir);
    println!("  Database:   {}", config.output.db_path);
    println!("  Save HTML:  {}", config.output.save_html);

    println!("\nSeed URLs ({}):", config.seeds.len());
    for seed in &config.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// `--stats`: opens the existing database and prints aggregate counts.
fn handle_stats(config: &webcrawl_core::Config) -> Result<(), Box<dyn std::error::Error>> {
    use webcrawl_core::output::{load_statistics, print_statistics};
    use webcrawl_core::storage::SqliteStorage;

    println!("Database: {}\n", config.output.db_path);

    let storage = SqliteStorage::new(Path::new(&config.output.db_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// `--export-summary`: renders a Markdown report from the existing database.
fn handle_export_summary(
    config: &webcrawl_core::Config,
) -> Result<(), Box<dyn std::error::Error>> {
    use webcrawl_core::output::{generate_markdown_summary, generate_summary};
    use webcrawl_core::storage::SqliteStorage;

    let summary_path = Path::new(&config.output.output_dir).join("summary.md");

    println!("=== Exporting Crawl Summary ===\n");
    println!("Database: {}", config.output.db_path);
    println!("Output:   {}", summary_path.display());

    let storage = SqliteStorage::new(Path::new(&config.output.db_path))?;

    tracing::info!("loading crawl data from database");
    let summary = generate_summary(&storage)?;

    tracing::info!("generating markdown summary");
    generate_markdown_summary(&summary, &summary_path)?;

    println!("\n✓ Summary exported to: {}", summary_path.display());
    Ok(())
}

/// Default crawl invocation: loads or resumes a session and runs to
/// completion.
async fn handle_crawl(
    config_path: &Path,
    config: webcrawl_core::Config,
    config_hash: String,
    resume: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let _ = config_path;

    if resume {
        tracing::info!("starting crawl (will resume an interrupted session if one exists)");
    } else {
        tracing::info!("starting fresh crawl, ignoring previous session state");
    }
    tracing::info!(seeds = config.seeds.len(), "seed URLs configured");

    match webcrawl_core::crawl(config, config_hash, resume).await {
        Ok(outcome) => {
            tracing::info!(
                session_id = outcome.session_id,
                crawled = outcome.crawled,
                failed = outcome.failed,
                skipped = outcome.skipped,
                "crawl completed"
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "crawl failed");
            Err(e.into())
        }
    }
}
