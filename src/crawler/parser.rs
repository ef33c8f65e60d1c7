//! HTML extraction: metadata, structured data, links, headings, images,
//! and cleaned text.
//!
//! Grounded on the six-pass extraction order of the system being modeled:
//! metadata and structured data are pulled first (while the tree is
//! intact), text is pulled last (after later passes no longer need the
//! original markup).

use scraper::node::Node;
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;
use url::Url;

const IGNORE_TAGS: &[&str] = &[
    "script", "style", "noscript", "header", "footer", "nav", "aside", "form", "button", "input",
    "select", "textarea", "iframe", "svg", "canvas",
];

const MAX_ANCHOR_TEXT: usize = 200;
const MAX_HEADING_TEXT: usize = 200;
const MAX_IMAGES: usize = 50;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub author: Option<String>,
    pub robots: Option<String>,
    pub og_title: Option<String>,
    pub og_description: Option<String>,
    pub og_image: Option<String>,
    pub og_type: Option<String>,
    pub twitter_card: Option<String>,
    pub canonical: Option<String>,
    pub lang: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Anchor,
    Frame,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedLink {
    pub url: String,
    pub text: String,
    pub internal: bool,
    pub nofollow: bool,
    pub kind: LinkKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub src: String,
    pub alt: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    pub metadata: PageMetadata,
    pub structured_data: Vec<serde_json::Value>,
    pub links: Vec<ExtractedLink>,
    pub headings: HashMap<u8, Vec<String>>,
    pub images: Vec<ImageRecord>,
    pub text: String,
}

fn selector(cache: &mut HashMap<&'static str, Selector>, css: &'static str) -> Selector {
    cache
        .entry(css)
        .or_insert_with(|| Selector::parse(css).expect("valid selector"))
        .clone()
}

/// Parses `html`, resolving relative URLs against `base_url`.
pub fn parse(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);
    let base_host = base_url.host_str().unwrap_or("").to_string();

    let metadata = extract_metadata(&document);
    let structured_data = extract_structured_data(&document);
    let links = extract_links(&document, base_url, &base_host);
    let headings = extract_headings(&document);
    let images = extract_images(&document, base_url);
    let text = extract_text(&document);

    ParsedPage {
        metadata,
        structured_data,
        links,
        headings,
        images,
        text,
    }
}

fn extract_metadata(document: &Html) -> PageMetadata {
    let title_sel = Selector::parse("title").unwrap();
    let title = document
        .select(&title_sel)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty());

    let meta_sel = Selector::parse("meta").unwrap();
    let mut description = None;
    let mut keywords = Vec::new();
    let mut author = None;
    let mut robots = None;
    let mut og_title = None;
    let mut og_description = None;
    let mut og_image = None;
    let mut og_type = None;
    let mut twitter_card = None;

    for meta in document.select(&meta_sel) {
        let content = meta.value().attr("content").map(str::trim).unwrap_or("");
        if content.is_empty() {
            continue;
        }
        let key = meta
            .value()
            .attr("name")
            .or_else(|| meta.value().attr("property"))
            .unwrap_or("")
            .to_ascii_lowercase();

        match key.as_str() {
            "description" => description = Some(content.to_string()),
            "keywords" => {
                keywords = content
                    .split(',')
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
                    .collect()
            }
            "author" => author = Some(content.to_string()),
            "robots" => robots = Some(content.to_string()),
            "og:title" => og_title = Some(content.to_string()),
            "og:description" => og_description = Some(content.to_string()),
            "og:image" => og_image = Some(content.to_string()),
            "og:type" => og_type = Some(content.to_string()),
            "twitter:card" => twitter_card = Some(content.to_string()),
            _ => {}
        }
    }

    let canonical_sel = Selector::parse("link[rel='canonical']").unwrap();
    let canonical = document
        .select(&canonical_sel)
        .next()
        .and_then(|e| e.value().attr("href"))
        .map(str::to_string);

    let html_sel = Selector::parse("html").unwrap();
    let lang = document
        .select(&html_sel)
        .next()
        .and_then(|e| e.value().attr("lang"))
        .map(str::to_string);

    PageMetadata {
        title,
        description,
        keywords,
        author,
        robots,
        og_title,
        og_description,
        og_image,
        og_type,
        twitter_card,
        canonical,
        lang,
    }
}

fn extract_structured_data(document: &Html) -> Vec<serde_json::Value> {
    let sel = Selector::parse(r#"script[type="application/ld+json"]"#).unwrap();
    let mut out = Vec::new();

    for script in document.select(&sel) {
        let content: String = script.text().collect();
        let content = content.trim();
        if content.is_empty() {
            continue;
        }
        match serde_json::from_str::<serde_json::Value>(content) {
            Ok(serde_json::Value::Array(items)) => out.extend(items),
            Ok(value) => out.push(value),
            Err(_) => continue,
        }
    }

    out
}

fn extract_links(document: &Html, base_url: &Url, base_host: &str) -> Vec<ExtractedLink> {
    let mut links = Vec::new();

    let a_sel = Selector::parse("a[href]").unwrap();
    for element in document.select(&a_sel) {
        let href = element.value().attr("href").unwrap_or("").trim();
        if let Some(url) = resolve_followable(href, base_url) {
            let text: String = element.text().collect::<String>().trim().chars().take(MAX_ANCHOR_TEXT).collect();
            let nofollow = element
                .value()
                .attr("rel")
                .map(|r| r.to_ascii_lowercase().contains("nofollow"))
                .unwrap_or(false);
            let internal = url.host_str().unwrap_or("") == base_host;
            links.push(ExtractedLink {
                url: url.to_string(),
                text,
                internal,
                nofollow,
                kind: LinkKind::Anchor,
            });
        }
    }

    let frame_sel = Selector::parse("frame[src], iframe[src]").unwrap();
    for element in document.select(&frame_sel) {
        let src = element.value().attr("src").unwrap_or("").trim();
        if let Some(url) = resolve_followable(src, base_url) {
            let internal = url.host_str().unwrap_or("") == base_host;
            links.push(ExtractedLink {
                url: url.to_string(),
                text: String::new(),
                internal,
                nofollow: false,
                kind: LinkKind::Frame,
            });
        }
    }

    links
}

fn resolve_followable(href: &str, base_url: &Url) -> Option<Url> {
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    if href.starts_with("javascript:") || href.starts_with("mailto:") || href.starts_with("tel:") {
        return None;
    }
    base_url.join(href).ok()
}

fn extract_headings(document: &Html) -> HashMap<u8, Vec<String>> {
    let mut headings = HashMap::new();
    for level in 1u8..=6 {
        let css = format!("h{}", level);
        let Ok(sel) = Selector::parse(&css) else { continue };
        let texts: Vec<String> = document
            .select(&sel)
            .map(|e| e.text().collect::<String>().trim().chars().take(MAX_HEADING_TEXT).collect::<String>())
            .filter(|s| !s.is_empty())
            .collect();
        if !texts.is_empty() {
            headings.insert(level, texts);
        }
    }
    headings
}

fn extract_images(document: &Html, base_url: &Url) -> Vec<ImageRecord> {
    let sel = Selector::parse("img").unwrap();
    let mut images = Vec::new();
    for element in document.select(&sel) {
        if images.len() >= MAX_IMAGES {
            break;
        }
        let src = element
            .value()
            .attr("src")
            .or_else(|| element.value().attr("data-src"));
        let Some(src) = src else { continue };
        let Ok(resolved) = base_url.join(src) else { continue };
        images.push(ImageRecord {
            src: resolved.to_string(),
            alt: element.value().attr("alt").map(str::to_string),
            title: element.value().attr("title").map(str::to_string),
        });
    }
    images
}

fn whitespace_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"\s+").unwrap())
}

fn extract_text(document: &Html) -> String {
    let ignore: HashSet<&str> = IGNORE_TAGS.iter().copied().collect();
    let mut parts = Vec::new();

    for node in document.tree.root().descendants() {
        match node.value() {
            Node::Text(text) => {
                if is_within_ignored(node, &ignore) {
                    continue;
                }
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    parts.push(trimmed.to_string());
                }
            }
            Node::Comment(_) => continue,
            _ => {}
        }
    }

    let joined = parts.join(" ");
    whitespace_regex().replace_all(&joined, " ").trim().to_string()
}

fn is_within_ignored(node: ego_tree::NodeRef<Node>, ignore: &HashSet<&str>) -> bool {
    let mut current = node.parent();
    while let Some(ancestor) = current {
        if let Node::Element(el) = ancestor.value() {
            if ignore.contains(el.name()) {
                return true;
            }
        }
        current = ancestor.parent();
    }
    false
}

/// Filters `parsed.links` down to what the crawler should follow: empty if
/// the page's robots meta opts out entirely, otherwise nofollow/external
/// links are dropped per the given flags and duplicates are removed,
/// preserving first occurrence.
pub fn get_crawlable_links(
    parsed: &ParsedPage,
    respect_nofollow: bool,
    internal_only: bool,
) -> Vec<String> {
    if let Some(robots) = &parsed.metadata.robots {
        if robots.to_ascii_lowercase().contains("nofollow") {
            return Vec::new();
        }
    }

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for link in &parsed.links {
        if respect_nofollow && link.nofollow {
            continue;
        }
        if internal_only && !link.internal {
            continue;
        }
        if seen.insert(link.url.clone()) {
            out.push(link.url.clone());
        }
    }
    out
}
