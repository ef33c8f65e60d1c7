//! HTTP fetcher: one GET per attempt, retried with exponential backoff,
//! gated by the per-host rate limiter and dressed in the identity
//! provider's headers and delay.

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::crawler::identity::IdentityProvider;
use crate::crawler::rate_limiter::RateLimiter;
use crate::crawler::sitemap::SimpleFetch;
use reqwest::{redirect::Policy, Client};
use std::sync::Arc;
use std::time::{Duration, Instant};

const MAX_REDIRECTS: usize = 5;
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// The kind of failure a fetch attempt ended in, surfaced after retries are
/// exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Timeout,
    ClientError,
    TooLarge,
    ReadFailed,
    Unexpected,
}

/// The outcome of fetching one URL. `is_success` derives from status and
/// the absence of an error kind, matching the data model's
/// `success ⇔ status ∈ [200,400) ∧ error = ∅`.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub final_url: String,
    pub status: u16,
    pub content_type: String,
    pub headers: Vec<(String, String)>,
    pub elapsed: Duration,
    pub body: Option<String>,
    pub error: Option<FetchErrorKind>,
    pub error_message: Option<String>,
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none() && (200..400).contains(&self.status)
    }

    fn failure(kind: FetchErrorKind, message: String, elapsed: Duration) -> Self {
        Self {
            final_url: String::new(),
            status: 0,
            content_type: String::new(),
            headers: Vec::new(),
            elapsed,
            body: None,
            error: Some(kind),
            error_message: Some(message),
        }
    }
}

/// Performs GET requests on behalf of the crawler, applying rate limiting,
/// identity headers/delay, retry-with-backoff, and a content-length cap.
pub struct Fetcher {
    client: Client,
    rate_limiter: Arc<RateLimiter>,
    identity: Arc<IdentityProvider>,
    max_retries: u32,
    max_content_length: u64,
    delay_min: f64,
    delay_max: f64,
    allowed_content_types: Vec<String>,
}

impl Fetcher {
    pub fn new(
        user_agent_config: &UserAgentConfig,
        crawler_config: &CrawlerConfig,
        rate_limiter: Arc<RateLimiter>,
        identity: Arc<IdentityProvider>,
    ) -> Result<Self, reqwest::Error> {
        let proxy = identity.get_proxy();
        let client = build_client(user_agent_config, crawler_config.request_timeout, proxy.as_deref())?;
        Ok(Self {
            client,
            rate_limiter,
            identity,
            max_retries: crawler_config.max_retries,
            max_content_length: crawler_config.max_content_length,
            delay_min: crawler_config.delay_min,
            delay_max: crawler_config.delay_max,
            allowed_content_types: crawler_config.allowed_content_types.clone(),
        })
    }

    /// Fetches `url`, applying politeness delay/rate-limiting, then retrying
    /// transient failures with `2^attempt` second backoff up to
    /// `max_retries` times.
    pub async fn fetch(&self, url: &str, referer: Option<&str>) -> FetchResult {
        let host = match ::url::Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_string)) {
            Some(h) => h,
            None => {
                return FetchResult::failure(
                    FetchErrorKind::Unexpected,
                    format!("cannot determine host for {}", url),
                    Duration::ZERO,
                )
            }
        };

        let mut attempt = 0;
        loop {
            self.rate_limiter.acquire(&host).await;
            let delay = self.identity.get_delay(self.delay_min, self.delay_max);
            tokio::time::sleep(delay).await;

            let headers = self.identity.get_headers(referer);
            let result = self.attempt_once(url, headers).await;

            let retryable = match result.error {
                Some(FetchErrorKind::Timeout) => true,
                Some(FetchErrorKind::Unexpected) => true,
                Some(FetchErrorKind::ReadFailed) => true,
                _ if result.status >= 500 => true,
                _ => false,
            };

            if !retryable || attempt >= self.max_retries {
                return result;
            }

            let backoff = Duration::from_secs(2u64.saturating_pow(attempt));
            tracing::debug!(url, attempt, ?backoff, "retrying fetch");
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }

    async fn attempt_once(&self, url: &str, headers: reqwest::header::HeaderMap) -> FetchResult {
        let start = Instant::now();
        let response = match self.client.get(url).headers(headers).send().await {
            Ok(r) => r,
            Err(e) => {
                let kind = if e.is_timeout() {
                    FetchErrorKind::Timeout
                } else if e.is_connect() {
                    FetchErrorKind::Unexpected
                } else {
                    FetchErrorKind::Unexpected
                };
                return FetchResult::failure(kind, e.to_string(), start.elapsed());
            }
        };

        let final_url = response.url().to_string();
        let status = response.status().as_u16();
        let response_headers = headers_of(&response);

        if let Some(len) = response.content_length() {
            if len > self.max_content_length {
                return FetchResult {
                    final_url,
                    status,
                    content_type: content_type_of(&response),
                    headers: response_headers,
                    elapsed: start.elapsed(),
                    body: None,
                    error: Some(FetchErrorKind::TooLarge),
                    error_message: Some(format!(
                        "content length {} exceeds limit {}",
                        len, self.max_content_length
                    )),
                };
            }
        }

        let content_type = content_type_of(&response);

        if status >= 400 && status < 500 {
            return FetchResult {
                final_url,
                status,
                content_type,
                headers: response_headers,
                elapsed: start.elapsed(),
                body: None,
                error: Some(FetchErrorKind::ClientError),
                error_message: Some(format!("HTTP {}", status)),
            };
        }

        let is_html_family = content_type.contains("html") || content_type.contains("xhtml");
        let is_text = if self.allowed_content_types.is_empty() {
            is_html_family || content_type.starts_with("text/")
        } else {
            is_html_family
                || (content_type.starts_with("text/")
                    && self
                        .allowed_content_types
                        .iter()
                        .any(|allowed| content_type.contains(allowed.as_str())))
        };

        let body = if is_text {
            match response.text().await {
                Ok(text) => Some(text),
                Err(e) => {
                    return FetchResult::failure(
                        FetchErrorKind::ReadFailed,
                        e.to_string(),
                        start.elapsed(),
                    )
                }
            }
        } else {
            None
        };

        FetchResult {
            final_url,
            status,
            content_type,
            headers: response_headers,
            elapsed: start.elapsed(),
            body,
            error: if status >= 500 {
                Some(FetchErrorKind::ClientError)
            } else {
                None
            },
            error_message: if status >= 500 {
                Some(format!("HTTP {}", status))
            } else {
                None
            },
        }
    }

    /// A lightweight, non-retrying GET used for robots.txt and sitemap
    /// fetches, which only need `{status, body}`.
    pub async fn fetch_raw(&self, url: &str) -> Option<SimpleFetch> {
        let response = self.client.get(url).send().await.ok()?;
        let status = response.status().as_u16();
        let body = response.bytes().await.ok()?.to_vec();
        Some(SimpleFetch { status, body })
    }
}

fn content_type_of(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

/// Captures response headers as owned name/value pairs. Values that aren't
/// valid UTF-8 are skipped rather than lossily re-encoded.
fn headers_of(response: &reqwest::Response) -> Vec<(String, String)> {
    response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

fn build_client(
    config: &UserAgentConfig,
    request_timeout: u64,
    proxy_url: Option<&str>,
) -> Result<Client, reqwest::Error> {
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.name, config.version, config.contact_url, config.contact_email
    );

    let mut builder = Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(request_timeout))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true);

    if let Some(url) = proxy_url {
        builder = builder.proxy(reqwest::Proxy::all(url)?);
    }

    builder.build()
}
