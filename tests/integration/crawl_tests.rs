//! Integration tests for the crawl engine.
//!
//! Each test stands up a `wiremock` server as a synthetic site, points a
//! [`Coordinator`] at it over a `tempfile`-backed database, and inspects
//! the resulting session/URL rows through the `Storage` trait.

use std::sync::Arc;
use tempfile::tempdir;
use webcrawl_core::config::{Config, CrawlerConfig, OutputConfig, ProxyConfig, UserAgentConfig};
use webcrawl_core::crawler::Coordinator;
use webcrawl_core::state::UrlStatus;
use webcrawl_core::storage::{SqliteStorage, Storage};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(seed: String, db_path: &std::path::Path, output_dir: &std::path::Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_pages: 100,
            max_depth: 2,
            max_retries: 1,
            requests_per_second: 50.0,
            concurrent_requests: 4,
            delay_min: 0.0,
            delay_max: 0.0,
            request_timeout: 5,
            render_timeout: 5,
            max_content_length: 10_000_000,
            allowed_content_types: vec!["text/html".to_string()],
            enable_rendering: false,
            block_resources: vec![],
            respect_robots_txt: true,
            respect_nofollow: true,
            parse_sitemaps: false,
        },
        user_agent: UserAgentConfig {
            name: "TestBot".to_string(),
            version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
            rotate: false,
        },
        proxy: ProxyConfig::default(),
        output: OutputConfig {
            output_dir: output_dir.to_string_lossy().to_string(),
            db_path: db_path.to_string_lossy().to_string(),
            save_html: false,
        },
        seeds: vec![seed],
    }
}

#[tokio::test]
async fn crawls_a_small_site_to_completion() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!(
                    r#"<html><head><title>Home</title></head><body>
                    <a href="{base}/a">A</a>
                    <a href="{base}/b">B</a>
                    <a href="https://external.example/other">External</a>
                    </body></html>"#,
                    base = base_url
                ))
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!(
                    r#"<html><head><title>A</title></head><body><a href="{base}/c">C</a></body></html>"#,
                    base = base_url
                ))
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><head><title>B</title></head><body>b</body></html>"#)
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/c"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><head><title>C</title></head><body>c</body></html>"#)
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let dir = tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");
    let config = test_config(format!("{}/", base_url), &db_path, dir.path());

    let coordinator = Arc::new(
        Coordinator::new(config, "testhash".to_string(), false)
            .await
            .expect("coordinator construction failed"),
    );
    let outcome = coordinator.run().await.expect("crawl failed");

    assert_eq!(outcome.crawled, 4, "expected /, /a, /b, /c to be crawled");
    assert_eq!(outcome.failed, 0);

    let storage = SqliteStorage::new(&db_path).expect("failed to open database");
    let completed = storage
        .count_urls_by_status(outcome.session_id, UrlStatus::Completed)
        .expect("failed to count completed urls");
    assert_eq!(completed, 4);

    // The external link is never added to the frontier, so it never reaches
    // the URL table at all.
    assert!(storage
        .get_url(outcome.session_id, "https://external.example/other")
        .expect("query failed")
        .is_none());
}

#[tokio::test]
async fn honors_robots_txt_disallow_rules() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /admin"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!(
                    r#"<html><head><title>Home</title></head><body>
                    <a href="{base}/allowed">Allowed</a>
                    <a href="{base}/admin">Admin</a>
                    </body></html>"#,
                    base = base_url
                ))
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/allowed"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><head><title>Allowed</title></head><body>ok</body></html>"#)
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/admin"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><head><title>Admin</title></head><body>secret</body></html>"#)
                .insert_header("content-type", "text/html"),
        )
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");
    let config = test_config(format!("{}/", base_url), &db_path, dir.path());

    let coordinator = Arc::new(
        Coordinator::new(config, "testhash".to_string(), false)
            .await
            .expect("coordinator construction failed"),
    );
    let outcome = coordinator.run().await.expect("crawl failed");

    assert_eq!(outcome.crawled, 2, "expected / and /allowed to be crawled");
    assert_eq!(outcome.failed, 0);
    assert_eq!(outcome.skipped, 1, "expected /admin to be skipped as robots-disallowed");

    let storage = SqliteStorage::new(&db_path).expect("failed to open database");
    let admin = storage
        .get_url(outcome.session_id, &format!("{}/admin", base_url))
        .expect("query failed")
        .expect("admin url should have been recorded");
    assert_eq!(admin.status, UrlStatus::Failed);
    assert_eq!(admin.error.as_deref(), Some("disallowed by robots.txt"));
}

#[tokio::test]
async fn respects_max_depth_boundary() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!(
                    r#"<html><head><title>Root</title></head><body><a href="{base}/level1">L1</a></body></html>"#,
                    base = base_url
                ))
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/level1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!(
                    r#"<html><head><title>L1</title></head><body><a href="{base}/level2">L2</a></body></html>"#,
                    base = base_url
                ))
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    // /level2 is at depth 2, equal to max_depth: the page is fetched, but its
    // own out-links (depth 3) are never followed, so /level3 is never hit.
    Mock::given(method("GET"))
        .and(path("/level2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!(
                    r#"<html><head><title>L2</title></head><body><a href="{base}/level3">L3</a></body></html>"#,
                    base = base_url
                ))
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/level3"))
        .respond_with(ResponseTemplate::new(200).set_body_string("should never be fetched"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");
    let mut config = test_config(format!("{}/", base_url), &db_path, dir.path());
    config.crawler.max_depth = 2;

    let coordinator = Arc::new(
        Coordinator::new(config, "testhash".to_string(), false)
            .await
            .expect("coordinator construction failed"),
    );
    let outcome = coordinator.run().await.expect("crawl failed");

    assert_eq!(outcome.crawled, 3, "expected /, /level1, /level2");
    assert_eq!(outcome.failed, 0);
}

#[tokio::test]
async fn resumes_a_running_session_without_refetching_completed_urls() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><head><title>Home</title></head><body>ok</body></html>"#)
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let dir = tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");
    let config = test_config(format!("{}/", base_url), &db_path, dir.path());

    let first = Arc::new(
        Coordinator::new(config.clone(), "testhash".to_string(), false)
            .await
            .expect("first coordinator construction failed"),
    );
    let first_outcome = first.run().await.expect("first crawl failed");
    assert_eq!(first_outcome.crawled, 1);

    // A fresh coordinator against the same database and config hash, with
    // resume requested: since the prior session was marked Completed (not
    // left Running), there is nothing to resume into and a new session is
    // created with the single seed re-queued.
    let second = Arc::new(
        Coordinator::new(config, "testhash".to_string(), true)
            .await
            .expect("second coordinator construction failed"),
    );
    let second_outcome = second.run().await.expect("second crawl failed");
    assert_eq!(second_outcome.crawled, 1);
    assert_ne!(second_outcome.session_id, first_outcome.session_id);
}
