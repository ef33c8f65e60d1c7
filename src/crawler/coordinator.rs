//! Orchestrator and worker pool.
//!
//! Bootstraps a session (fresh or resumed), discovers sitemaps for the
//! seed host, then spawns a pool of workers pulling from the shared
//! frontier until it drains or `max_pages` is reached.

use crate::config::Config;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::frontier::{Frontier, Priority};
use crate::crawler::identity::IdentityProvider;
use crate::crawler::parser;
use crate::crawler::rate_limiter::RateLimiter;
use crate::crawler::sitemap::{discover_sitemaps, SimpleFetch};
use crate::robots::RobotsManager;
use crate::storage::{ContentLog, ContentRecord, SessionStatus, SqliteStorage, Storage};
use crate::CrawlError;
use chrono::Utc;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const SITEMAP_HOST_CAP: usize = 5;
const SITEMAP_URL_CAP: usize = 1000;
const FRONTIER_POLL_TIMEOUT: Duration = Duration::from_millis(500);
const EXPECTED_URLS_HINT: usize = 50_000;

#[derive(Debug, Default)]
struct Counters {
    crawled: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
}

/// Final tallies from a completed (or shut-down) crawl run.
#[derive(Debug, Clone, Copy)]
pub struct CrawlOutcome {
    pub session_id: i64,
    pub crawled: u64,
    pub failed: u64,
    pub skipped: u64,
}

/// Drives one crawl session from seed(s) through completion, fan-out
/// across a pool of workers that share a single [`Frontier`].
pub struct Coordinator {
    config: Config,
    frontier: Arc<Frontier>,
    rate_limiter: Arc<RateLimiter>,
    fetcher: Arc<Fetcher>,
    robots: Arc<RobotsManager>,
    storage: Arc<Mutex<SqliteStorage>>,
    content_log: Arc<ContentLog>,
    counters: Arc<Counters>,
    shutdown: Arc<AtomicBool>,
    session_id: i64,
}

impl Coordinator {
    /// Opens persistence, creates or resumes a session, discovers the seed
    /// host's sitemaps, and seeds the frontier, ready for [`Coordinator::run`].
    pub async fn new(config: Config, config_hash: String, resume: bool) -> Result<Self, CrawlError> {
        let mut storage = SqliteStorage::new(std::path::Path::new(&config.output.db_path))?;

        let resumed = if resume {
            storage.get_latest_session()?.filter(|s| s.status == SessionStatus::Running)
        } else {
            None
        };

        let frontier = Arc::new(Frontier::new(EXPECTED_URLS_HINT));

        let session_id = match resumed {
            Some(session) => {
                if session.config_hash != config_hash {
                    tracing::warn!(
                        session_id = session.id,
                        "resuming session created with a different configuration"
                    );
                }
                let pending = storage.get_pending_urls(session.id, u32::MAX)?;
                for p in pending {
                    frontier
                        .add(&p.url, Priority::Normal, p.depth, p.parent_url)
                        .await;
                }
                session.id
            }
            None => {
                let seed = config.seeds[0].clone();
                let session_id = storage.create_session(&seed, &config_hash)?;
                for seed_url in &config.seeds {
                    storage.add_url(session_id, seed_url, 0, None)?;
                    frontier.add(seed_url, Priority::Highest, 0, None).await;
                }
                session_id
            }
        };

        let rate_limiter = Arc::new(RateLimiter::new(Duration::from_secs_f64(
            1.0 / config.crawler.requests_per_second,
        )));
        let identity = Arc::new(IdentityProvider::new(
            if config.user_agent.rotate {
                None
            } else {
                Some(format!(
                    "{}/{} (+{}; {})",
                    config.user_agent.name,
                    config.user_agent.version,
                    config.user_agent.contact_url,
                    config.user_agent.contact_email
                ))
            },
            config.user_agent.rotate,
            config.proxy.list.clone(),
        ));
        let fetcher = Arc::new(Fetcher::new(
            &config.user_agent,
            &config.crawler,
            rate_limiter.clone(),
            identity,
        )?);
        let robots = Arc::new(RobotsManager::new(config.user_agent.name.clone()));
        let content_log = Arc::new(ContentLog::open(
            std::path::Path::new(&config.output.output_dir),
            session_id,
        )?);

        if config.crawler.parse_sitemaps {
            if let Some(seed_host) = host_of(&config.seeds[0]) {
                let fetch_fn = fetch_closure(fetcher.clone());
                let robots_rules = robots.get_rules(&seed_host, &fetch_fn).await;
                let sitemap_urls =
                    discover_sitemaps(&seed_host, robots_rules.sitemaps(), &fetch_fn).await;

                for sitemap_url in sitemap_urls.into_iter().take(SITEMAP_HOST_CAP) {
                    let entries =
                        crate::crawler::sitemap::process_sitemap(&sitemap_url, &fetch_fn, 3).await;
                    for entry in entries.into_iter().take(SITEMAP_URL_CAP) {
                        if frontier
                            .add(&entry.loc, Priority::High, 1, Some(config.seeds[0].clone()))
                            .await
                        {
                            storage.add_url(session_id, &entry.loc, 1, Some(&config.seeds[0]))?;
                        }
                    }
                }
            }
        }

        Ok(Self {
            config,
            frontier,
            rate_limiter,
            fetcher,
            robots,
            storage: Arc::new(Mutex::new(storage)),
            content_log,
            counters: Arc::new(Counters::default()),
            shutdown: Arc::new(AtomicBool::new(false)),
            session_id,
        })
    }

    /// A flag that, once set, tells every worker to stop after its current
    /// item. Clone and hand to a signal handler to support external
    /// shutdown requests.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Spawns `concurrent_requests` workers and waits for them all to
    /// finish, then marks the session completed and returns final counts.
    pub async fn run(self: Arc<Self>) -> Result<CrawlOutcome, CrawlError> {
        let worker_count = self.config.crawler.concurrent_requests;
        let mut handles = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let coordinator = self.clone();
            handles.push(tokio::spawn(async move {
                coordinator.worker_loop(worker_id).await;
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }

        let crawled = self.counters.crawled.load(Ordering::Relaxed);
        let failed = self.counters.failed.load(Ordering::Relaxed);
        let skipped = self.counters.skipped.load(Ordering::Relaxed);

        {
            let mut storage = self.storage.lock().await;
            storage.update_session(
                self.session_id,
                Some(SessionStatus::Completed),
                Some(crawled),
                Some(failed),
            )?;
        }

        Ok(CrawlOutcome {
            session_id: self.session_id,
            crawled,
            failed,
            skipped,
        })
    }

    async fn worker_loop(&self, worker_id: usize) {
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                tracing::debug!(worker_id, "shutdown requested, worker exiting");
                return;
            }

            let processed = self.counters.crawled.load(Ordering::Relaxed)
                + self.counters.failed.load(Ordering::Relaxed)
                + self.counters.skipped.load(Ordering::Relaxed);
            if processed >= self.config.crawler.max_pages {
                return;
            }

            let item = match self.frontier.get(FRONTIER_POLL_TIMEOUT).await {
                Some(item) => item,
                None => {
                    if self.frontier.is_empty().await {
                        return;
                    }
                    continue;
                }
            };

            self.process_item(item).await;
        }
    }

    async fn process_item(&self, item: crate::crawler::frontier::UrlItem) {
        let host = match host_of(&item.url) {
            Some(h) => h,
            None => {
                self.frontier.complete(&item.url, false).await;
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        if self.config.crawler.respect_robots_txt {
            let fetch_fn = fetch_closure(self.fetcher.clone());
            let rules = self.robots.get_rules(&host, &fetch_fn).await;

            if let Some(delay) = rules.crawl_delay() {
                self.rate_limiter
                    .update_delay(&host, Duration::from_secs_f64(delay))
                    .await;
            }

            if !rules.is_allowed(&path_of(&item.url)) {
                self.frontier.complete(&item.url, false).await;
                self.counters.skipped.fetch_add(1, Ordering::Relaxed);
                self.mark_failed(&item.url, None, Some("disallowed by robots.txt")).await;
                return;
            }
        }

        let result = self
            .fetcher
            .fetch(&item.url, item.parent.as_deref())
            .await;

        if !result.is_success() {
            let message = result
                .error_message
                .unwrap_or_else(|| "fetch failed".to_string());
            self.mark_failed(&item.url, Some(result.status), Some(&message)).await;
            self.frontier.complete(&item.url, false).await;
            self.counters.failed.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let body = result.body.clone().unwrap_or_default();
        let base_url = match ::url::Url::parse(&result.final_url) {
            Ok(u) => u,
            Err(_) => {
                self.mark_failed(&item.url, Some(result.status), Some("invalid final URL")).await;
                self.frontier.complete(&item.url, false).await;
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        let parsed = parser::parse(&body, &base_url);

        if item.depth < self.config.crawler.max_depth {
            let follow_links = parser::get_crawlable_links(
                &parsed,
                self.config.crawler.respect_nofollow,
                true,
            );

            if !follow_links.is_empty() {
                let mut storage = self.storage.lock().await;
                for link in follow_links {
                    if self
                        .frontier
                        .add(&link, Priority::Normal, item.depth + 1, Some(item.url.clone()))
                        .await
                    {
                        let _ = storage.add_url(
                            self.session_id,
                            &link,
                            item.depth + 1,
                            Some(&item.url),
                        );
                    }
                }
            }
        }

        let record = ContentRecord::new(
            item.url.clone(),
            Utc::now().to_rfc3339(),
            parsed.metadata.title.clone(),
            parsed.metadata.description.clone(),
            parsed.text.clone(),
            parsed.links.len(),
            item.depth,
            if self.config.output.save_html {
                Some(body.clone())
            } else {
                None
            },
        );
        if let Err(e) = self.content_log.append(&record) {
            tracing::warn!(url = %item.url, error = %e, "failed to append content record");
        }

        {
            let mut storage = self.storage.lock().await;
            if let Err(e) = storage.mark_url_crawled(
                self.session_id,
                &item.url,
                Some(result.status),
                Some(&result.content_type),
                None,
            ) {
                tracing::warn!(url = %item.url, error = %e, "failed to persist crawled URL");
            }
        }

        self.frontier.complete(&item.url, true).await;
        self.counters.crawled.fetch_add(1, Ordering::Relaxed);
    }

    async fn mark_failed(&self, url: &str, status: Option<u16>, error: Option<&str>) {
        let mut storage = self.storage.lock().await;
        if let Err(e) = storage.mark_url_crawled(self.session_id, url, status, None, error) {
            tracing::warn!(url, error = %e, "failed to persist failed URL");
        }
    }
}

fn host_of(url: &str) -> Option<String> {
    ::url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

fn path_of(url: &str) -> String {
    match ::url::Url::parse(url) {
        Ok(parsed) => match parsed.query() {
            Some(query) => format!("{}?{}", parsed.path(), query),
            None => parsed.path().to_string(),
        },
        Err(_) => "/".to_string(),
    }
}

type FetchFn = Box<
    dyn Fn(String) -> Pin<Box<dyn Future<Output = Option<SimpleFetch>> + Send>> + Send + Sync,
>;

fn fetch_closure(fetcher: Arc<Fetcher>) -> FetchFn {
    Box::new(move |url: String| {
        let fetcher = fetcher.clone();
        Box::pin(async move { fetcher.fetch_raw(&url).await })
    })
}
