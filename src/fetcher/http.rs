//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - Per-host politeness delays
//! - Reporting redirects without following them
//! - Enforcing the maximum download size
//! - Classifying transport failures

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::fetcher::{FetchResponse, FetchStatus, FetchTransport, ResponseBody};
use crate::parser::parse_content_type;
use crate::url::{canonicalize_with_base, WebUrl};
use crate::CrawlError;
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{redirect::Policy, Client, Response};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// Redirects are never followed by the client; the crawl worker decides what
/// to do with them.
///
/// # Example
///
/// ```no_run
/// use webweave::config::UserAgentConfig;
/// use webweave::fetcher::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "Webweave".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::none()) // Handle redirects manually
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed [`FetchTransport`]
pub struct HttpFetcher {
    client: Client,
    politeness_delay: Duration,
    max_download_size: usize,
    /// Earliest instant the next request to each host may start; only hosts
    /// whose slot is still in the future are kept
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl HttpFetcher {
    pub fn new(client: Client, config: &CrawlerConfig) -> Self {
        Self {
            client,
            politeness_delay: Duration::from_millis(config.politeness_delay),
            max_download_size: config.max_download_size,
            next_slot: Mutex::new(HashMap::new()),
        }
    }

    /// Reserves the next request slot for `host` and returns how long to wait for it
    fn reserve_slot(&self, host: &str) -> Duration {
        let now = Instant::now();
        let mut slots = self.next_slot.lock();
        let ready = slots.get(host).copied().unwrap_or(now).max(now);

        // A slot in the past is the same as no entry
        slots.retain(|_, slot| *slot > now);
        slots.insert(host.to_string(), ready + self.politeness_delay);
        ready - now
    }
}

#[async_trait]
impl FetchTransport for HttpFetcher {
    async fn fetch_header(&self, url: &WebUrl) -> Result<FetchResponse, CrawlError> {
        let request_url = Url::parse(&url.url)?;

        if let Some(host) = request_url.host_str() {
            let wait = self.reserve_slot(host);
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }
        }

        let response = match self.client.get(request_url).send().await {
            Ok(response) => response,
            Err(e) => {
                if e.is_timeout() {
                    tracing::warn!("Request timeout for {}", url);
                } else if e.is_connect() {
                    tracing::warn!("Connection failed for {}: {}", url, e);
                } else {
                    tracing::warn!("Fatal transport error for {}: {}", url, e);
                }
                return Ok(FetchResponse::new(
                    FetchStatus::FatalTransportError,
                    url.url.clone(),
                ));
            }
        };

        let status = response.status();
        let fetched_url = response.url().to_string();
        let result = FetchResponse::new(FetchStatus::Http(status.as_u16()), fetched_url.clone());

        if status.is_redirection() {
            let moved_to = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|location| canonicalize_with_base(location, response.url()).ok())
                .map(|target| target.to_string());
            return Ok(result.with_moved_to(moved_to));
        }

        if !status.is_success() {
            return Ok(result);
        }

        if let Some(length) = response.content_length() {
            if length > self.max_download_size as u64 {
                tracing::debug!(
                    "{} declares {} bytes, above the {} byte limit",
                    url,
                    length,
                    self.max_download_size
                );
                return Ok(FetchResponse::new(FetchStatus::PageTooBig, fetched_url));
            }
        }

        let (mime, charset) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(parse_content_type)
            .unwrap_or((None, None));

        Ok(result
            .with_content_type(mime, charset)
            .with_body(Box::new(HttpBody {
                url: fetched_url,
                response,
            })))
    }
}

/// Pending reqwest response body; dropping it releases the connection
struct HttpBody {
    url: String,
    response: Response,
}

#[async_trait]
impl ResponseBody for HttpBody {
    async fn read_to_end(self: Box<Self>, max_size: usize) -> Result<Vec<u8>, CrawlError> {
        let HttpBody { url, mut response } = *self;
        let mut content = Vec::new();

        loop {
            let chunk = response.chunk().await.map_err(|source| CrawlError::Http {
                url: url.clone(),
                source,
            })?;

            let Some(chunk) = chunk else {
                break;
            };

            if content.len() + chunk.len() > max_size {
                return Err(CrawlError::PageTooBig {
                    url,
                    limit: max_size,
                });
            }
            content.extend_from_slice(&chunk);
        }

        Ok(content)
    }
}
