//! XML sitemap discovery and expansion.
//!
//! Supports plain URL sets, gzip-compressed bodies, sitemap-index recursion,
//! and a regex-based `<loc>` fallback when XML parsing fails.

use flate2::read::GzDecoder;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use regex::Regex;
use std::collections::HashSet;
use std::io::Read;
use std::sync::OnceLock;

const COMMON_SITEMAP_PATHS: &[&str] = &[
    "/sitemap.xml",
    "/sitemap_index.xml",
    "/sitemap/sitemap.xml",
    "/sitemaps/sitemap.xml",
];

const DEFAULT_MAX_DEPTH: u32 = 3;
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A single `<url>` entry from a sitemap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapUrl {
    pub loc: String,
    pub lastmod: Option<String>,
    pub changefreq: Option<String>,
    pub priority: Option<String>,
}

fn loc_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<loc>\s*(http[^<\s]+)\s*</loc>").unwrap())
}

/// A lightweight HTTP response used by sitemap/robots fetches.
pub struct SimpleFetch {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Fetches one sitemap URL (possibly recursing into a sitemap index),
/// returning the flattened list of page URLs it names.
///
/// `fetch` performs the raw HTTP GET; it is injected so this function stays
/// free of any particular HTTP client.
pub async fn process_sitemap<F, Fut>(
    url: &str,
    fetch: &F,
    max_depth: u32,
) -> Vec<SitemapUrl>
where
    F: Fn(String) -> Fut,
    Fut: std::future::Future<Output = Option<SimpleFetch>>,
{
    let mut visited = HashSet::new();
    process_sitemap_inner(url, fetch, max_depth, &mut visited).await
}

fn process_sitemap_inner<'a, F, Fut>(
    url: &'a str,
    fetch: &'a F,
    max_depth: u32,
    visited: &'a mut HashSet<String>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Vec<SitemapUrl>> + 'a>>
where
    F: Fn(String) -> Fut,
    Fut: std::future::Future<Output = Option<SimpleFetch>>,
{
    Box::pin(async move {
        if visited.contains(url) {
            return Vec::new();
        }
        visited.insert(url.to_string());

        let response = match fetch(url.to_string()).await {
            Some(r) if r.status == 200 => r,
            _ => return Vec::new(),
        };

        let body = if response.body.starts_with(&GZIP_MAGIC) {
            let mut decoder = GzDecoder::new(response.body.as_slice());
            let mut out = String::new();
            if decoder.read_to_string(&mut out).is_err() {
                return Vec::new();
            }
            out
        } else {
            match String::from_utf8(response.body) {
                Ok(s) => s,
                Err(_) => return Vec::new(),
            }
        };

        match parse_sitemap_xml(&body) {
            Some(ParsedSitemap::Index(locs)) => {
                if max_depth == 0 {
                    return Vec::new();
                }
                let mut out = Vec::new();
                for loc in locs {
                    let children =
                        process_sitemap_inner(&loc, fetch, max_depth - 1, visited).await;
                    out.extend(children);
                }
                out
            }
            Some(ParsedSitemap::UrlSet(urls)) => urls,
            None => extract_locs_via_regex(&body)
                .into_iter()
                .map(|loc| SitemapUrl {
                    loc,
                    lastmod: None,
                    changefreq: None,
                    priority: None,
                })
                .collect(),
        }
    })
}

enum ParsedSitemap {
    Index(Vec<String>),
    UrlSet(Vec<SitemapUrl>),
}

/// Parses sitemap XML, stripping namespace prefixes from element names.
/// Returns `None` on malformed XML so the caller can fall back to regex.
fn parse_sitemap_xml(xml: &str) -> Option<ParsedSitemap> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut is_index = false;
    let mut root_seen = false;

    let mut urls = Vec::new();
    let mut index_locs = Vec::new();

    let mut current_tag: Option<String> = None;
    let mut current_loc: Option<String> = None;
    let mut current_lastmod: Option<String> = None;
    let mut current_changefreq: Option<String> = None;
    let mut current_priority: Option<String> = None;
    let mut in_entry = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = local_name(e.name().as_ref());
                if !root_seen {
                    root_seen = true;
                    is_index = name == "sitemapindex";
                }
                if name == "url" || name == "sitemap" {
                    in_entry = true;
                    current_loc = None;
                    current_lastmod = None;
                    current_changefreq = None;
                    current_priority = None;
                } else if in_entry {
                    current_tag = Some(name);
                }
            }
            Ok(Event::Text(e)) => {
                if let Ok(text) = e.unescape() {
                    let text = text.trim().to_string();
                    if text.is_empty() {
                        continue;
                    }
                    match current_tag.as_deref() {
                        Some("loc") => current_loc = Some(text),
                        Some("lastmod") => current_lastmod = Some(text),
                        Some("changefreq") => current_changefreq = Some(text),
                        Some("priority") => current_priority = Some(text),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = local_name(e.name().as_ref());
                if name == "url" || name == "sitemap" {
                    in_entry = false;
                    if let Some(loc) = current_loc.take() {
                        if is_index {
                            index_locs.push(loc);
                        } else {
                            urls.push(SitemapUrl {
                                loc,
                                lastmod: current_lastmod.take(),
                                changefreq: current_changefreq.take(),
                                priority: current_priority.take(),
                            });
                        }
                    }
                } else if current_tag.as_deref() == Some(name.as_str()) {
                    current_tag = None;
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }

    if !root_seen {
        return None;
    }

    if is_index {
        Some(ParsedSitemap::Index(index_locs))
    } else {
        Some(ParsedSitemap::UrlSet(urls))
    }
}

fn local_name(qname: &[u8]) -> String {
    let s = String::from_utf8_lossy(qname);
    match s.rfind(':') {
        Some(idx) => s[idx + 1..].to_lowercase(),
        None => s.to_lowercase(),
    }
}

fn extract_locs_via_regex(body: &str) -> Vec<String> {
    loc_regex()
        .captures_iter(body)
        .map(|c| c[1].to_string())
        .collect()
}

/// Discovers candidate sitemap URLs for a host: the union of robots-declared
/// sitemaps and a probe of common well-known paths, the latter retained only
/// when the probe returns 200.
pub async fn discover_sitemaps<F, Fut>(
    host: &str,
    robots_sitemaps: &[String],
    fetch: &F,
) -> Vec<String>
where
    F: Fn(String) -> Fut,
    Fut: std::future::Future<Output = Option<SimpleFetch>>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for url in robots_sitemaps {
        if seen.insert(url.clone()) {
            out.push(url.clone());
        }
    }

    for path in COMMON_SITEMAP_PATHS {
        let url = format!("https://{}{}", host, path);
        if seen.contains(&url) {
            continue;
        }
        if let Some(response) = fetch(url.clone()).await {
            if response.status == 200 {
                seen.insert(url.clone());
                out.push(url);
            }
        }
    }

    out
}

/// Default recursion cap for sitemap-index expansion (§4.8).
pub fn default_max_depth() -> u32 {
    DEFAULT_MAX_DEPTH
}
