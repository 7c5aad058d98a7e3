use serde::Deserialize;

/// Main configuration structure for Webweave
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub robots: RobotsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Seed URLs the crawl starts from (depth 0)
    #[serde(default)]
    pub seeds: Vec<String>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of concurrent crawl workers
    #[serde(rename = "number-of-crawlers")]
    pub number_of_crawlers: usize,

    /// Maximum depth to crawl from seed URLs (-1 means unlimited)
    #[serde(rename = "max-depth")]
    pub max_depth: i32,

    /// Maximum number of outgoing links accepted from a single page
    #[serde(rename = "max-outgoing-links")]
    pub max_outgoing_links: usize,

    /// Whether 3xx responses are followed by scheduling their target
    #[serde(rename = "follow-redirects")]
    pub follow_redirects: bool,

    /// Whether content with no registered parser falls back to the binary parser
    #[serde(rename = "include-binary-content")]
    pub include_binary_content: bool,

    /// Maximum response body size in bytes
    #[serde(rename = "max-download-size")]
    pub max_download_size: usize,

    /// Minimum time between two requests to the same host (milliseconds)
    #[serde(rename = "politeness-delay")]
    pub politeness_delay: u64,

    /// Number of URLs a worker takes from the frontier at once
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// How long an idle worker waits before polling the frontier again (milliseconds)
    #[serde(rename = "idle-wait")]
    pub idle_wait: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            number_of_crawlers: 4,
            max_depth: -1,
            max_outgoing_links: 5000,
            follow_redirects: true,
            include_binary_content: false,
            max_download_size: 1_048_576,
            politeness_delay: 200,
            batch_size: 50,
            idle_wait: 3000,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler, also used as the robots.txt user agent token
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Robots.txt handling configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RobotsConfig {
    /// Whether robots.txt is consulted at all
    pub enabled: bool,

    /// Hours after which a cached robots.txt is fetched again
    #[serde(rename = "cache-ttl-hours")]
    pub cache_ttl_hours: i64,
}

impl Default for RobotsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_ttl_hours: 24,
        }
    }
}

/// Persistence configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file holding the URL to document-id mapping.
    /// Without it ids live in memory for the duration of the process.
    #[serde(rename = "doc-id-database")]
    pub doc_id_database: Option<String>,
}
