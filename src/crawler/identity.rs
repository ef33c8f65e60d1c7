//! Identity provider: request headers, human-like delays, and proxy rotation.
//!
//! Grounded on the stealth/header-rotation behavior of the system being
//! modeled: a small pool of plausible browser user-agents, a realistic
//! header set derived from the chosen one, an exponential delay sampler,
//! and round-robin proxy selection.

use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:124.0) Gecko/20100101 Firefox/124.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.3 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36 Edg/122.0.0.0",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:124.0) Gecko/20100101 Firefox/124.0",
];

const ACCEPT_VALUES: &[&str] = &[
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
];

const ACCEPT_LANGUAGE_VALUES: &[&str] = &["en-US,en;q=0.9", "en-GB,en;q=0.8,en-US;q=0.6"];

/// Provides per-request headers, delays, and outbound proxy selection,
/// mimicking a plausible human/browser visitor.
pub struct IdentityProvider {
    fixed_user_agent: Option<String>,
    rotate: bool,
    proxies: Vec<String>,
    proxy_index: AtomicUsize,
}

impl IdentityProvider {
    /// Builds an identity provider. `user_agent` pins the UA string (with a
    /// crawler-name/version/contact suffix); when `None` or `rotate` is set,
    /// headers are drawn from a pool of plausible browser UAs instead.
    pub fn new(user_agent: Option<String>, rotate: bool, proxies: Vec<String>) -> Self {
        Self {
            fixed_user_agent: user_agent,
            rotate,
            proxies,
            proxy_index: AtomicUsize::new(0),
        }
    }

    fn choose_user_agent(&self) -> String {
        if let Some(ua) = &self.fixed_user_agent {
            if !self.rotate {
                return ua.clone();
            }
        }
        let mut rng = rand::thread_rng();
        USER_AGENTS.choose(&mut rng).unwrap().to_string()
    }

    /// Returns a realistic browser header set for a request, optionally
    /// setting `Referer`.
    pub fn get_headers(&self, referer: Option<&str>) -> HeaderMap {
        let mut rng = rand::thread_rng();
        let user_agent = self.choose_user_agent();
        let mut headers = HeaderMap::new();

        let user_agent_value = HeaderValue::from_str(&user_agent).unwrap_or_else(|_| {
            tracing::warn!(%user_agent, "configured user-agent is not a valid header value, falling back to default");
            HeaderValue::from_static(USER_AGENTS[0])
        });
        headers.insert(HeaderName::from_static("user-agent"), user_agent_value);
        headers.insert(
            HeaderName::from_static("accept"),
            HeaderValue::from_static(ACCEPT_VALUES[rng.gen_range(0..ACCEPT_VALUES.len())]),
        );
        headers.insert(
            HeaderName::from_static("accept-language"),
            HeaderValue::from_static(
                ACCEPT_LANGUAGE_VALUES[rng.gen_range(0..ACCEPT_LANGUAGE_VALUES.len())],
            ),
        );
        headers.insert(
            HeaderName::from_static("accept-encoding"),
            HeaderValue::from_static("gzip, deflate, br"),
        );
        headers.insert(
            HeaderName::from_static("connection"),
            HeaderValue::from_static("keep-alive"),
        );
        headers.insert(
            HeaderName::from_static("upgrade-insecure-requests"),
            HeaderValue::from_static("1"),
        );

        if user_agent.contains("Chrome") || user_agent.contains("Edg") {
            headers.insert(
                HeaderName::from_static("sec-fetch-dest"),
                HeaderValue::from_static("document"),
            );
            headers.insert(
                HeaderName::from_static("sec-fetch-mode"),
                HeaderValue::from_static("navigate"),
            );
            headers.insert(
                HeaderName::from_static("sec-fetch-site"),
                HeaderValue::from_static(if referer.is_some() {
                    "same-origin"
                } else {
                    "none"
                }),
            );
            headers.insert(
                HeaderName::from_static("sec-ch-ua"),
                HeaderValue::from_static(
                    "\"Chromium\";v=\"122\", \"Not(A:Brand\";v=\"24\", \"Google Chrome\";v=\"122\"",
                ),
            );
        }

        if let Some(referer) = referer {
            if let Ok(value) = HeaderValue::from_str(referer) {
                headers.insert(HeaderName::from_static("referer"), value);
            }
        }

        if rng.gen_bool(0.3) {
            headers.insert(HeaderName::from_static("dnt"), HeaderValue::from_static("1"));
        }

        headers
    }

    /// Samples a human-like delay from an exponential distribution, clamped
    /// to `[lo, hi]`, with a ~10% chance of an extra 1-3s "reading pause".
    pub fn get_delay(&self, lo: f64, hi: f64) -> Duration {
        let mut rng = rand::thread_rng();
        let mean = ((lo + hi) / 2.0).max(0.01);
        let lambda = 1.0 / mean;
        let sample: f64 = -(1.0 - rng.gen::<f64>()).ln() / lambda;
        let mut delay = sample.clamp(lo, hi);

        if rng.gen_bool(0.1) {
            delay += rng.gen_range(1.0..3.0);
        }

        Duration::from_secs_f64(delay)
    }

    /// Returns the next proxy URL, round-robining through the configured
    /// list. Returns `None` if no proxies are configured.
    pub fn get_proxy(&self) -> Option<String> {
        if self.proxies.is_empty() {
            return None;
        }
        let idx = self.proxy_index.fetch_add(1, Ordering::Relaxed) % self.proxies.len();
        Some(self.proxies[idx].clone())
    }
}
