//! Fetch transport
//!
//! A fetch happens in two phases: [`FetchTransport::fetch_header`] returns
//! the status and headers with the body still pending, and the worker then
//! decides whether to pull the body with [`FetchResponse::fetch_content`].
//! A pending body must be released with
//! [`FetchResponse::discard_content_if_not_consumed`] on every exit path.

mod http;

pub use http::{build_http_client, HttpFetcher};

use crate::url::WebUrl;
use crate::CrawlError;
use async_trait::async_trait;
use std::fmt;

/// Status code reported for a page above the configured download limit
pub const PAGE_TOO_BIG: u16 = 1001;
/// Status code reported when the request could not be sent or answered
pub const FATAL_TRANSPORT_ERROR: u16 = 1005;
/// Status code reported for failures with no better classification
pub const UNKNOWN_ERROR: u16 = 1006;

/// Outcome of a header fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// The server answered with this HTTP status
    Http(u16),

    /// The response is larger than the maximum download size
    PageTooBig,

    /// Connection, TLS, or timeout failure
    FatalTransportError,

    UnknownError,
}

impl FetchStatus {
    /// Returns the numeric code passed to status callbacks
    pub fn code(&self) -> u16 {
        match self {
            Self::Http(code) => *code,
            Self::PageTooBig => PAGE_TOO_BIG,
            Self::FatalTransportError => FATAL_TRANSPORT_ERROR,
            Self::UnknownError => UNKNOWN_ERROR,
        }
    }

    /// Returns a human readable description of the status
    pub fn description(&self) -> &'static str {
        match self {
            Self::Http(code) => reqwest::StatusCode::from_u16(*code)
                .ok()
                .and_then(|status| status.canonical_reason())
                .unwrap_or("Unknown HTTP status"),
            Self::PageTooBig => "Page size was too big",
            Self::FatalTransportError => "Fatal transport error",
            Self::UnknownError => "Unknown error",
        }
    }

    /// Returns true for 2xx responses
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Http(code) if (200..300).contains(code))
    }

    /// Returns true for responses that point at another URL
    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Http(301 | 302 | 303 | 307 | 308))
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.description())
    }
}

/// A response body that has not been read yet
#[async_trait]
pub trait ResponseBody: Send {
    /// Reads the whole body, failing once it grows past `max_size` bytes
    async fn read_to_end(self: Box<Self>, max_size: usize) -> Result<Vec<u8>, CrawlError>;

    /// Releases the body without reading it
    fn discard(self: Box<Self>) {}
}

/// Body that is already in memory
#[derive(Debug, Clone)]
pub struct BytesBody {
    url: String,
    bytes: Vec<u8>,
}

impl BytesBody {
    pub fn new(url: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            bytes: bytes.into(),
        }
    }
}

#[async_trait]
impl ResponseBody for BytesBody {
    async fn read_to_end(self: Box<Self>, max_size: usize) -> Result<Vec<u8>, CrawlError> {
        if self.bytes.len() > max_size {
            return Err(CrawlError::PageTooBig {
                url: self.url,
                limit: max_size,
            });
        }
        Ok(self.bytes)
    }
}

/// Result of a header fetch, possibly holding a pending body
pub struct FetchResponse {
    pub status: FetchStatus,

    /// URL the response was actually served from
    pub fetched_url: String,

    /// Canonical redirect target, for 3xx responses with a usable `Location`
    pub moved_to_url: Option<String>,

    /// MIME type without parameters, lowercase
    pub content_type: Option<String>,

    pub content_charset: Option<String>,

    body: Option<Box<dyn ResponseBody>>,
}

impl FetchResponse {
    /// Creates a response with no redirect target, content type, or body
    pub fn new(status: FetchStatus, fetched_url: impl Into<String>) -> Self {
        Self {
            status,
            fetched_url: fetched_url.into(),
            moved_to_url: None,
            content_type: None,
            content_charset: None,
            body: None,
        }
    }

    pub fn with_moved_to(mut self, moved_to_url: Option<String>) -> Self {
        self.moved_to_url = moved_to_url;
        self
    }

    pub fn with_content_type(mut self, mime: Option<String>, charset: Option<String>) -> Self {
        self.content_type = mime;
        self.content_charset = charset;
        self
    }

    pub fn with_body(mut self, body: Box<dyn ResponseBody>) -> Self {
        self.body = Some(body);
        self
    }

    /// Returns true while the body is neither read nor discarded
    pub fn has_pending_content(&self) -> bool {
        self.body.is_some()
    }

    /// Reads the pending body; can succeed at most once
    pub async fn fetch_content(&mut self, max_size: usize) -> Result<Vec<u8>, CrawlError> {
        let body = self.body.take().ok_or_else(|| CrawlError::ContentConsumed {
            url: self.fetched_url.clone(),
        })?;
        body.read_to_end(max_size).await
    }

    /// Releases the pending body, if any. Safe to call repeatedly.
    pub fn discard_content_if_not_consumed(&mut self) {
        if let Some(body) = self.body.take() {
            body.discard();
        }
    }
}

impl fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchResponse")
            .field("status", &self.status)
            .field("fetched_url", &self.fetched_url)
            .field("moved_to_url", &self.moved_to_url)
            .field("content_type", &self.content_type)
            .field("content_charset", &self.content_charset)
            .field("has_pending_content", &self.has_pending_content())
            .finish()
    }
}

/// Network access used by crawl workers
#[async_trait]
pub trait FetchTransport: Send + Sync {
    /// Requests `url` and returns once the status and headers are known
    ///
    /// Transport failures are reported through [`FetchStatus`]; `Err` is
    /// reserved for failures that are not about the remote server.
    async fn fetch_header(&self, url: &WebUrl) -> Result<FetchResponse, CrawlError>;
}
