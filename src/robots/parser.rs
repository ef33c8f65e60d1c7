//! Hand-rolled robots.txt parser.
//!
//! Grounded on the line-by-line directive walk of the system being modeled,
//! including its exact `User-agent` group-transition fix: consecutive
//! `User-agent:` lines accumulate into one pending group; the group's
//! applicability is frozen on the first non-UA directive that follows; any
//! later `User-agent:` line always starts a fresh group, regardless of
//! whether the previous group applied to us.

use std::sync::OnceLock;

#[derive(Debug, Clone)]
struct Rule {
    pattern: String,
    allow: bool,
}

/// Parsed robots.txt rules applicable to our user agent, plus any
/// crawl-delay and sitemap directives the file declared.
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    rules: Vec<Rule>,
    crawl_delay: Option<f64>,
    sitemaps: Vec<String>,
    allow_all: bool,
}

impl ParsedRobots {
    /// Parses raw robots.txt content, keeping only the directives from
    /// groups that apply to `user_agent`.
    pub fn from_content(content: &str, user_agent: &str) -> Self {
        let agent_token = primary_token(user_agent);
        let mut rules = Vec::new();
        let mut crawl_delay = None;
        let mut sitemaps = Vec::new();

        // Pending group: UA names accumulated so far, frozen to Some(bool)
        // once we see the first non-UA directive after them.
        let mut pending_agents: Vec<String> = Vec::new();
        let mut group_applies: Option<bool> = None;

        for raw_line in content.lines() {
            let line = strip_comment(raw_line).trim();
            if line.is_empty() {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((f, v)) => (f.trim().to_ascii_lowercase(), v.trim()),
                None => continue,
            };

            match field.as_str() {
                "user-agent" => {
                    if group_applies.is_some() {
                        // A directive already closed the previous group;
                        // any User-agent line now starts a brand new one.
                        pending_agents.clear();
                        group_applies = None;
                    }
                    pending_agents.push(value.to_ascii_lowercase());
                }
                "disallow" | "allow" => {
                    if group_applies.is_none() && !pending_agents.is_empty() {
                        group_applies = Some(
                            pending_agents
                                .iter()
                                .any(|a| matches_user_agent(a, &agent_token)),
                        );
                    }
                    if group_applies == Some(true) && !value.is_empty() {
                        rules.push(Rule {
                            pattern: value.to_string(),
                            allow: field == "allow",
                        });
                    } else if group_applies == Some(true) && field == "disallow" && value.is_empty()
                    {
                        // "Disallow:" with no value means allow everything.
                    }
                }
                "crawl-delay" => {
                    if group_applies.is_none() && !pending_agents.is_empty() {
                        group_applies = Some(
                            pending_agents
                                .iter()
                                .any(|a| matches_user_agent(a, &agent_token)),
                        );
                    }
                    if group_applies == Some(true) {
                        if let Ok(seconds) = value.parse::<f64>() {
                            crawl_delay = Some(match crawl_delay {
                                Some(existing) => f64::max(existing, seconds),
                                None => seconds,
                            });
                        }
                    }
                }
                "sitemap" => {
                    sitemaps.push(value.to_string());
                }
                _ => {}
            }
        }

        Self {
            rules,
            crawl_delay,
            sitemaps,
            allow_all: false,
        }
    }

    /// A permissive instance used when robots.txt is missing or fails to
    /// fetch (i.e. everything is allowed).
    pub fn allow_all() -> Self {
        Self {
            rules: Vec::new(),
            crawl_delay: None,
            sitemaps: Vec::new(),
            allow_all: true,
        }
    }

    /// Whether `path` (an absolute path, with query string if any) may be
    /// fetched. Longest matching pattern wins; ties favor `Allow`. No
    /// matching rule means allowed.
    pub fn is_allowed(&self, path: &str) -> bool {
        if self.allow_all || self.rules.is_empty() {
            return true;
        }

        let mut best: Option<(usize, bool)> = None;
        for rule in &self.rules {
            if let Some(len) = pattern_match_len(&rule.pattern, path) {
                match best {
                    Some((best_len, best_allow)) => {
                        if len > best_len || (len == best_len && rule.allow && !best_allow) {
                            best = Some((len, rule.allow));
                        }
                    }
                    None => best = Some((len, rule.allow)),
                }
            }
        }

        best.map(|(_, allow)| allow).unwrap_or(true)
    }

    pub fn crawl_delay(&self) -> Option<f64> {
        self.crawl_delay
    }

    pub fn sitemaps(&self) -> &[String] {
        &self.sitemaps
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// The first whitespace-delimited token of a UA string, lowercased, used
/// for matching against robots.txt `User-agent` patterns (e.g. an HTTP
/// user-agent of "Mozilla/5.0 MyBot/1.0" matches on "mozilla/5.0").
fn primary_token(user_agent: &str) -> String {
    user_agent
        .split_whitespace()
        .next()
        .unwrap_or(user_agent)
        .to_ascii_lowercase()
}

fn matches_user_agent(pattern: &str, agent_token: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    agent_token.starts_with(pattern) || agent_token.contains(pattern)
}

/// Returns the length of `pattern` if it matches `path`, for longest-match
/// comparison; `None` if it doesn't match at all. `*` matches any run of
/// characters; a trailing `$` anchors the match to the end of `path`.
fn pattern_match_len(pattern: &str, path: &str) -> Option<usize> {
    let regex = pattern_regex_cache(pattern)?;
    if regex.is_match(path) {
        Some(pattern.len())
    } else {
        None
    }
}

fn pattern_regex_cache(pattern: &str) -> Option<regex::Regex> {
    static ANCHORS: OnceLock<()> = OnceLock::new();
    ANCHORS.get_or_init(|| {});

    let (body, anchored) = match pattern.strip_suffix('$') {
        Some(stripped) => (stripped, true),
        None => (pattern, false),
    };

    let mut escaped = String::from("^");
    for part in body.split('*') {
        if escaped.len() > 1 {
            escaped.push_str(".*");
        }
        escaped.push_str(&regex::escape(part));
    }
    if anchored {
        escaped.push('$');
    }

    regex::Regex::new(&escaped).ok()
}
