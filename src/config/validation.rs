use crate::config::types::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_seeds(&config.seeds)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    // max_depth = 0 is a valid boundary: crawl only the seed, follow no links.
    if config.max_pages == 0 {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1".to_string(),
        ));
    }

    if config.max_retries == 0 {
        return Err(ConfigError::Validation(
            "max_retries must be >= 1".to_string(),
        ));
    }

    if config.concurrent_requests == 0 {
        return Err(ConfigError::Validation(
            "concurrent_requests must be >= 1".to_string(),
        ));
    }

    if config.delay_min > config.delay_max {
        return Err(ConfigError::Validation(format!(
            "delay_min ({}) must be <= delay_max ({})",
            config.delay_min, config.delay_max
        )));
    }

    if config.requests_per_second <= 0.0 {
        return Err(ConfigError::Validation(
            "requests_per_second must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent.name cannot be empty or whitespace-only".to_string(),
        ));
    }

    // Validate contact URL
    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    // Validate contact email (basic validation)
    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.output_dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output_dir cannot be empty".to_string(),
        ));
    }

    if config.db_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "db_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the seed URL list
fn validate_seeds(seeds: &[String]) -> Result<(), ConfigError> {
    if seeds.is_empty() {
        return Err(ConfigError::Validation(
            "seeds must contain at least one URL".to_string(),
        ));
    }

    for seed in seeds {
        let url = Url::parse(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' must use http or https scheme",
                seed
            )));
        }
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        use crate::config::types::{OutputConfig, ProxyConfig, UserAgentConfig};
        Config {
            crawler: CrawlerConfig {
                max_pages: 100,
                max_depth: 3,
                max_retries: 3,
                requests_per_second: 2.0,
                concurrent_requests: 4,
                delay_min: 0.5,
                delay_max: 2.0,
                request_timeout: 30,
                render_timeout: 30,
                max_content_length: 10_000_000,
                allowed_content_types: vec!["text/html".to_string()],
                enable_rendering: false,
                block_resources: vec![],
                respect_robots_txt: true,
                respect_nofollow: true,
                parse_sitemaps: true,
            },
            user_agent: UserAgentConfig {
                name: "TestCrawler".to_string(),
                version: "1.0".to_string(),
                contact_url: "https://example.com/about".to_string(),
                contact_email: "admin@example.com".to_string(),
                rotate: false,
            },
            proxy: ProxyConfig::default(),
            output: OutputConfig {
                output_dir: "./out".to_string(),
                db_path: "./out/crawl.db".to_string(),
                save_html: false,
            },
            seeds: vec!["https://example.com/".to_string()],
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate(&base_config()).is_ok());
    }

    #[test]
    fn test_empty_user_agent_name_rejected() {
        let mut config = base_config();
        config.user_agent.name = "   ".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_max_depth_allowed_seed_only() {
        let mut config = base_config();
        config.crawler.max_depth = 0;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_delay_min_gt_max_rejected() {
        let mut config = base_config();
        config.crawler.delay_min = 5.0;
        config.crawler.delay_max = 1.0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_seeds_rejected() {
        let mut config = base_config();
        config.seeds = vec![];
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_malformed_contact_url_rejected() {
        let mut config = base_config();
        config.user_agent.contact_url = "not a url".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_malformed_email_rejected() {
        let mut config = base_config();
        config.user_agent.contact_email = "not-an-email".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_email_helper() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("user@domain").is_err());
    }
}
