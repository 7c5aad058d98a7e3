use crate::config::types::{Config, CrawlerConfig, RobotsConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Checks every section of a loaded configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    check_crawler(&config.crawler)?;
    check_user_agent(&config.user_agent)?;
    check_robots(&config.robots)?;
    config.seeds.iter().try_for_each(|seed| check_seed(seed))
}

fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<(), ConfigError> {
    if condition {
        Ok(())
    } else {
        Err(ConfigError::Validation(message()))
    }
}

fn check_crawler(crawler: &CrawlerConfig) -> Result<(), ConfigError> {
    ensure((1..=100).contains(&crawler.number_of_crawlers), || {
        format!(
            "number-of-crawlers must be in 1..=100, got {}",
            crawler.number_of_crawlers
        )
    })?;
    ensure(crawler.max_depth >= -1, || {
        format!(
            "max-depth must be -1 for unlimited or a non-negative depth, got {}",
            crawler.max_depth
        )
    })?;
    ensure(crawler.max_outgoing_links > 0, || {
        "max-outgoing-links must be positive".into()
    })?;
    ensure(crawler.max_download_size > 0, || {
        "max-download-size must be positive".into()
    })?;
    ensure(crawler.batch_size > 0, || "batch-size must be positive".into())?;
    ensure(crawler.idle_wait > 0, || "idle-wait must be positive".into())
}

fn check_user_agent(agent: &UserAgentConfig) -> Result<(), ConfigError> {
    let name = &agent.crawler_name;
    ensure(!name.is_empty(), || "crawler-name is required".into())?;
    ensure(
        name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'),
        || format!("crawler-name '{}' may only use letters, digits and '-'", name),
    )?;

    Url::parse(&agent.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("contact-url '{}': {}", agent.contact_url, e)))?;

    ensure(looks_like_email(&agent.contact_email), || {
        format!("contact-email '{}' is not an address", agent.contact_email)
    })
}

fn check_robots(robots: &RobotsConfig) -> Result<(), ConfigError> {
    ensure(robots.cache_ttl_hours > 0, || {
        format!(
            "robots cache-ttl-hours must be positive, got {}",
            robots.cache_ttl_hours
        )
    })
}

fn check_seed(seed: &str) -> Result<(), ConfigError> {
    let url = Url::parse(seed)
        .map_err(|e| ConfigError::InvalidUrl(format!("seed '{}': {}", seed, e)))?;
    ensure(matches!(url.scheme(), "http" | "https"), || {
        format!("seed '{}' is not an http(s) URL", seed)
    })
}

/// `local@domain.tld`, with exactly one `@`
fn looks_like_email(address: &str) -> bool {
    match address.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;

    fn valid() -> Config {
        Config {
            crawler: CrawlerConfig::default(),
            user_agent: UserAgentConfig {
                crawler_name: "webweave".to_string(),
                crawler_version: "0.1".to_string(),
                contact_url: "https://crawler.example/about".to_string(),
                contact_email: "ops@crawler.example".to_string(),
            },
            robots: RobotsConfig::default(),
            storage: StorageConfig::default(),
            seeds: vec!["https://docs.example/".to_string()],
        }
    }

    #[test]
    fn test_defaults_pass() {
        validate(&valid()).unwrap();
    }

    #[test]
    fn test_crawler_count_bounds() {
        for (count, ok) in [(0, false), (1, true), (100, true), (101, false)] {
            let mut config = valid();
            config.crawler.number_of_crawlers = count;
            assert_eq!(validate(&config).is_ok(), ok, "{} crawlers", count);
        }
    }

    #[test]
    fn test_depth_below_unlimited() {
        let mut config = valid();
        config.crawler.max_depth = 0;
        assert!(validate(&config).is_ok());

        config.crawler.max_depth = -2;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_zero_sized_limits() {
        let mut config = valid();
        config.crawler.max_outgoing_links = 0;
        assert!(validate(&config).is_err());

        let mut config = valid();
        config.crawler.batch_size = 0;
        assert!(validate(&config).is_err());

        let mut config = valid();
        config.robots.cache_ttl_hours = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_crawler_name_alphabet() {
        let mut config = valid();
        config.user_agent.crawler_name = "web-weave2".to_string();
        assert!(validate(&config).is_ok());

        config.user_agent.crawler_name = "web weave".to_string();
        assert!(validate(&config).is_err());

        config.user_agent.crawler_name = "webweave/1.0".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_seed_must_be_web_url() {
        let mut config = valid();
        config.seeds.push("http://plain.example/".to_string());
        assert!(validate(&config).is_ok());

        config.seeds.push("mailto:someone@plain.example".to_string());
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));

        config.seeds = vec!["/relative/path".to_string()];
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_email_shape() {
        assert!(looks_like_email("ops@crawler.example"));
        assert!(looks_like_email("first.last@mail.crawler.example"));

        assert!(!looks_like_email(""));
        assert!(!looks_like_email("ops"));
        assert!(!looks_like_email("@crawler.example"));
        assert!(!looks_like_email("ops@"));
        assert!(!looks_like_email("ops@localhost"));
        assert!(!looks_like_email("a@b@crawler.example"));
        assert!(!looks_like_email("ops@crawler.example."));
    }
}
