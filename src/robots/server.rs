//! Robots.txt backed politeness oracle

use crate::config::RobotsConfig;
use crate::robots::{CachedRobots, ParsedRobots, PolitenessOracle};
use crate::url::WebUrl;
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use std::collections::HashMap;
use url::Url;

/// Redirect hops followed when downloading a robots.txt
const MAX_ROBOTS_REDIRECTS: usize = 5;

/// Fetches, caches, and evaluates robots.txt per origin
///
/// A robots.txt that cannot be fetched, or answers with a non-success
/// status, allows everything on that origin.
pub struct RobotstxtServer {
    client: Client,
    user_agent: String,
    enabled: bool,
    ttl: chrono::Duration,
    cache: RwLock<HashMap<String, CachedRobots>>,
}

impl RobotstxtServer {
    /// Creates a new server
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client used to download robots.txt files
    /// * `config` - Robots configuration
    /// * `user_agent` - Product token matched against `User-agent` lines
    pub fn new(client: Client, config: &RobotsConfig, user_agent: impl Into<String>) -> Self {
        Self {
            client,
            user_agent: user_agent.into(),
            enabled: config.enabled,
            ttl: chrono::Duration::hours(config.cache_ttl_hours),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the number of origins with a cached robots.txt
    pub fn cached_origins(&self) -> usize {
        self.cache.read().len()
    }

    /// Rules for the URL's origin, downloaded again once the cached copy expires
    async fn robots_for(&self, url: &Url) -> ParsedRobots {
        let origin = url.origin().ascii_serialization();

        let cached = self
            .cache
            .read()
            .get(&origin)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.rules.clone());
        if let Some(rules) = cached {
            return rules;
        }

        let rules = self.download(&origin).await;
        self.cache
            .write()
            .insert(origin, CachedRobots::new(rules.clone(), self.ttl));
        rules
    }

    async fn download(&self, origin: &str) -> ParsedRobots {
        let mut robots_url = format!("{}/robots.txt", origin);

        for _ in 0..=MAX_ROBOTS_REDIRECTS {
            tracing::debug!("Fetching {}", robots_url);

            let response = match self.client.get(&robots_url).send().await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!("Could not fetch {}: {}", robots_url, e);
                    return ParsedRobots::Unrestricted;
                }
            };

            let status = response.status();
            if status.is_redirection() {
                match redirect_target(&robots_url, &response) {
                    Some(next) => {
                        tracing::debug!("{} redirects to {}", robots_url, next);
                        robots_url = next;
                        continue;
                    }
                    None => return ParsedRobots::Unrestricted,
                }
            }

            if !status.is_success() {
                tracing::debug!("{} answered HTTP {}", robots_url, status.as_u16());
                return ParsedRobots::Unrestricted;
            }

            return match response.text().await {
                Ok(body) => ParsedRobots::parse(&body),
                Err(e) => {
                    tracing::warn!("Could not read {}: {}", robots_url, e);
                    ParsedRobots::Unrestricted
                }
            };
        }

        tracing::warn!("Too many redirects fetching robots.txt for {}", origin);
        ParsedRobots::Unrestricted
    }
}

/// Resolves a redirect's `Location` against the URL that produced it
fn redirect_target(from: &str, response: &reqwest::Response) -> Option<String> {
    let location = response
        .headers()
        .get(reqwest::header::LOCATION)?
        .to_str()
        .ok()?;
    Url::parse(from).ok()?.join(location).ok().map(String::from)
}

#[async_trait]
impl PolitenessOracle for RobotstxtServer {
    async fn is_allowed(&self, url: &WebUrl) -> bool {
        if !self.enabled {
            return true;
        }

        let parsed = match Url::parse(&url.url) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!("Refusing unparseable URL {}: {}", url, e);
                return false;
            }
        };

        let robots = self.robots_for(&parsed).await;
        let allowed = robots.permits(&url.url, &self.user_agent);
        if !allowed {
            tracing::info!("URL {} disallowed by robots.txt", url);
        }
        allowed
    }
}
