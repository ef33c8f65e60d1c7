//! Robots.txt fetching, parsing, and per-domain caching.

mod cache;
mod parser;

pub use cache::CachedRobots;
pub use parser::ParsedRobots;

use crate::crawler::sitemap::SimpleFetch;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Parses a raw robots.txt body. Used directly when a caller already has
/// the response body in hand (e.g. from the fetcher's lightweight GET).
pub fn parse_robots(body: &str, user_agent: &str) -> ParsedRobots {
    ParsedRobots::from_content(body, user_agent)
}

/// Caches parsed robots.txt per host, refetching once a cached entry goes
/// stale (24h) or was never fetched. A non-200 response or fetch failure
/// yields an allow-all entry, same as the absence of a robots.txt file.
pub struct RobotsManager {
    cache: Mutex<HashMap<String, CachedRobots>>,
    user_agent: String,
}

impl RobotsManager {
    pub fn new(user_agent: String) -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
            user_agent,
        }
    }

    /// Gets the cached (or freshly fetched) robots rules for `host`.
    /// `fetch` performs `GET https://{host}/robots.txt`.
    pub async fn get_rules<F, Fut>(&self, host: &str, fetch: &F) -> CachedRobots
    where
        F: Fn(String) -> Fut,
        Fut: std::future::Future<Output = Option<SimpleFetch>>,
    {
        {
            let cache = self.cache.lock().await;
            if let Some(cached) = cache.get(host) {
                if !cached.is_stale() {
                    return cached.clone();
                }
            }
        }

        let url = format!("https://{}/robots.txt", host);
        let robots = match fetch(url).await {
            Some(response) if response.status == 200 => {
                match String::from_utf8(response.body) {
                    Ok(body) => ParsedRobots::from_content(&body, &self.user_agent),
                    Err(_) => ParsedRobots::allow_all(),
                }
            }
            _ => ParsedRobots::allow_all(),
        };

        let cached = CachedRobots::new(robots);
        self.cache
            .lock()
            .await
            .insert(host.to_string(), cached.clone());
        cached
    }

    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap as StdHashMap;
    use std::rc::Rc;

    fn fetch_from(
        bodies: Rc<RefCell<StdHashMap<String, (u16, Vec<u8>)>>>,
    ) -> impl Fn(String) -> std::pin::Pin<Box<dyn std::future::Future<Output = Option<SimpleFetch>>>>
    {
        move |url: String| {
            let bodies = bodies.clone();
            Box::pin(async move {
                bodies
                    .borrow()
                    .get(&url)
                    .map(|(status, body)| SimpleFetch {
                        status: *status,
                        body: body.clone(),
                    })
            })
        }
    }

    #[tokio::test]
    async fn test_get_rules_caches_result() {
        let mut bodies = StdHashMap::new();
        bodies.insert(
            "https://example.com/robots.txt".to_string(),
            (200u16, b"User-agent: *\nDisallow: /admin".to_vec()),
        );
        let bodies = Rc::new(RefCell::new(bodies));
        let fetch = fetch_from(bodies.clone());

        let manager = RobotsManager::new("TestBot".to_string());
        let rules = manager.get_rules("example.com", &fetch).await;
        assert!(!rules.is_allowed("/admin"));

        // Remove the backing response; cached copy should still be used.
        bodies.borrow_mut().clear();
        let rules_again = manager.get_rules("example.com", &fetch).await;
        assert!(!rules_again.is_allowed("/admin"));
    }

    #[tokio::test]
    async fn test_missing_robots_txt_allows_all() {
        let bodies = Rc::new(RefCell::new(StdHashMap::new()));
        let fetch = fetch_from(bodies);
        let manager = RobotsManager::new("TestBot".to_string());
        let rules = manager.get_rules("example.com", &fetch).await;
        assert!(rules.is_allowed("/anything"));
    }

    #[tokio::test]
    async fn test_clear_cache_forces_refetch() {
        let mut bodies = StdHashMap::new();
        bodies.insert(
            "https://example.com/robots.txt".to_string(),
            (200u16, b"User-agent: *\nDisallow: /".to_vec()),
        );
        let bodies = Rc::new(RefCell::new(bodies));
        let fetch = fetch_from(bodies.clone());

        let manager = RobotsManager::new("TestBot".to_string());
        manager.get_rules("example.com", &fetch).await;
        manager.clear_cache().await;

        bodies.borrow_mut().clear();
        let rules = manager.get_rules("example.com", &fetch).await;
        assert!(rules.is_allowed("/anything"));
    }
}
