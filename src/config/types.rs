use serde::Deserialize;

/// Top-level crawl configuration, loaded from a single TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    pub output: OutputConfig,
    /// One or more seed URLs to enqueue at startup.
    pub seeds: Vec<String>,
}

/// Crawl behavior options (§6 of the spec: `[crawler]`).
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    #[serde(rename = "max-pages")]
    pub max_pages: u64,

    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    #[serde(rename = "requests-per-second", default = "default_requests_per_second")]
    pub requests_per_second: f64,

    #[serde(rename = "concurrent-requests")]
    pub concurrent_requests: usize,

    #[serde(rename = "delay-min")]
    pub delay_min: f64,

    #[serde(rename = "delay-max")]
    pub delay_max: f64,

    #[serde(rename = "request-timeout")]
    pub request_timeout: u64,

    #[serde(rename = "render-timeout", default = "default_render_timeout")]
    pub render_timeout: u64,

    #[serde(rename = "max-content-length")]
    pub max_content_length: u64,

    #[serde(rename = "allowed-content-types")]
    pub allowed_content_types: Vec<String>,

    #[serde(rename = "enable-rendering", default)]
    pub enable_rendering: bool,

    #[serde(rename = "block-resources", default)]
    pub block_resources: Vec<String>,

    #[serde(rename = "respect-robots-txt", default = "default_true")]
    pub respect_robots_txt: bool,

    #[serde(rename = "respect-nofollow", default = "default_true")]
    pub respect_nofollow: bool,

    #[serde(rename = "parse-sitemaps", default = "default_true")]
    pub parse_sitemaps: bool,
}

fn default_requests_per_second() -> f64 {
    2.0
}

fn default_render_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

/// Identity the fetcher presents to remote servers (§4.5/§4.6).
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    pub name: String,
    pub version: String,

    #[serde(rename = "contact-url")]
    pub contact_url: String,

    #[serde(rename = "contact-email")]
    pub contact_email: String,

    #[serde(default)]
    pub rotate: bool,
}

/// Optional outbound proxy configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProxyConfig {
    pub url: Option<String>,

    #[serde(default)]
    pub rotation: bool,

    #[serde(default)]
    pub list: Vec<String>,
}

/// On-disk output locations (§6 on-disk layout).
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(rename = "output-dir")]
    pub output_dir: String,

    #[serde(rename = "db-path")]
    pub db_path: String,

    #[serde(rename = "save-html", default)]
    pub save_html: bool,
}
