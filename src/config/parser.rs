use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Reads, deserializes and validates a crawl configuration
///
/// ```no_run
/// use std::path::Path;
/// use webweave::config::load_config;
///
/// let config = load_config(Path::new("crawl.toml")).unwrap();
/// println!("{} seeds", config.seeds.len());
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    parse_config(&std::fs::read_to_string(path)?)
}

/// Deserializes and validates configuration text
pub fn parse_config(toml_text: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(toml_text)?;
    validate(&config)?;
    Ok(config)
}

/// Hex SHA-256 of the configuration file's bytes
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    Ok(digest(&std::fs::read(path)?))
}

/// Loads a configuration together with the hash of the exact text it came from
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let text = std::fs::read_to_string(path)?;
    let config = parse_config(&text)?;
    Ok((config, digest(text.as_bytes())))
}

fn digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const USER_AGENT: &str = r#"
[user-agent]
crawler-name = "webweave-test"
crawler-version = "0.1"
contact-url = "https://crawler.example/about"
contact-email = "ops@crawler.example"
"#;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_full_config() {
        let text = format!(
            r#"
seeds = ["https://docs.example/", "https://blog.example/feed"]

[crawler]
number-of-crawlers = 2
max-depth = 4
max-outgoing-links = 250
follow-redirects = false
include-binary-content = true
batch-size = 10

[robots]
enabled = false
cache-ttl-hours = 6

[storage]
doc-id-database = "state/docids.db"
{USER_AGENT}"#
        );
        let file = write_config(&text);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.seeds.len(), 2);
        assert_eq!(config.crawler.number_of_crawlers, 2);
        assert_eq!(config.crawler.max_depth, 4);
        assert_eq!(config.crawler.max_outgoing_links, 250);
        assert!(!config.crawler.follow_redirects);
        assert!(config.crawler.include_binary_content);
        assert_eq!(config.crawler.batch_size, 10);
        assert!(!config.robots.enabled);
        assert_eq!(config.robots.cache_ttl_hours, 6);
        assert_eq!(
            config.storage.doc_id_database.as_deref(),
            Some("state/docids.db")
        );
        assert_eq!(config.user_agent.crawler_name, "webweave-test");
    }

    #[test]
    fn test_omitted_sections_take_defaults() {
        let config = parse_config(USER_AGENT).unwrap();

        assert_eq!(config.crawler.number_of_crawlers, 4);
        assert_eq!(config.crawler.max_depth, -1);
        assert_eq!(config.crawler.max_outgoing_links, 5000);
        assert!(config.crawler.follow_redirects);
        assert!(!config.crawler.include_binary_content);
        assert_eq!(config.crawler.batch_size, 50);
        assert!(config.robots.enabled);
        assert_eq!(config.robots.cache_ttl_hours, 24);
        assert!(config.storage.doc_id_database.is_none());
        assert!(config.seeds.is_empty());
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/no/such/dir/crawl.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_malformed_toml() {
        let err = parse_config("[crawler\nmax-depth = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_rejected_by_validation() {
        let text = format!("[crawler]\nnumber-of-crawlers = 0\n{USER_AGENT}");
        let err = parse_config(&text).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_hash_matches_loaded_text() {
        let file = write_config(USER_AGENT);

        let (_, hash) = load_config_with_hash(file.path()).unwrap();
        assert_eq!(hash, compute_config_hash(file.path()).unwrap());
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn test_hash_tracks_content() {
        let a = write_config(USER_AGENT);
        let b = write_config(&format!("seeds = []\n{USER_AGENT}"));

        assert_ne!(
            compute_config_hash(a.path()).unwrap(),
            compute_config_hash(b.path()).unwrap()
        );
    }
}
