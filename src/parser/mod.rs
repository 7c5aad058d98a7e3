//! Page parsing
//!
//! The [`Parser`] picks a [`ParseStrategy`] for a fetched page from the
//! [`ContentTypeRegistry`] and stores the resulting [`ParseData`] on the page.

mod binary;
mod content_type;
mod html;
mod registry;
mod text;

pub use binary::BinaryParseStrategy;
pub use content_type::{decode_content, parse_content_type};
pub use html::HtmlParseStrategy;
pub use registry::{ContentTypeRegistry, StrategyFactory, BINARY_CONTENT_TYPE};
pub use text::TextParseStrategy;

use crate::config::CrawlerConfig;
use crate::crawler::Page;
use crate::url::WebUrl;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;

/// Errors a parse strategy can report
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Malformed content: {0}")]
    Malformed(String),

    #[error("Cannot decode content: {0}")]
    Decode(String),
}

/// Result of parsing an HTML page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlParseData {
    /// Decoded page source
    pub html: String,

    /// Visible body text, whitespace-collapsed
    pub text: String,

    /// Trimmed `<title>` text, empty when there is none
    pub title: String,

    /// Canonical outgoing links in document order, capped at the configured maximum
    pub outgoing_urls: Vec<WebUrl>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextParseData {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryParseData {
    pub content: Vec<u8>,
}

/// What a strategy extracted from a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseData {
    Html(HtmlParseData),
    Text(TextParseData),
    Binary(BinaryParseData),
}

impl ParseData {
    /// Returns the outgoing links; only HTML pages have any
    pub fn outgoing_urls(&self) -> &[WebUrl] {
        match self {
            Self::Html(html) => &html.outgoing_urls,
            Self::Text(_) | Self::Binary(_) => &[],
        }
    }

    pub fn as_html(&self) -> Option<&HtmlParseData> {
        match self {
            Self::Html(html) => Some(html),
            _ => None,
        }
    }
}

/// One way of turning page bytes into [`ParseData`]
pub trait ParseStrategy: Send {
    /// MIME types this strategy handles, lowercase
    fn mime_types(&self) -> &'static [&'static str];

    fn parse(&self, page: &Page, config: &CrawlerConfig) -> Result<ParseData, ParseError>;
}

/// Dispatches pages to parse strategies
///
/// Each worker owns one parser; the registry is shared.
#[derive(Debug, Clone)]
pub struct Parser {
    registry: Arc<ContentTypeRegistry>,
    config: Arc<CrawlerConfig>,
}

impl Parser {
    pub fn new(registry: Arc<ContentTypeRegistry>, config: Arc<CrawlerConfig>) -> Self {
        Self { registry, config }
    }

    /// Parses `page` in place, filling its parse data
    ///
    /// Returns false when no strategy applies or the strategy fails. A
    /// panicking strategy counts as a failure.
    pub fn parse(&self, page: &mut Page) -> bool {
        let Some(factory) = self.resolve(page.content_type.as_deref()) else {
            tracing::debug!(
                "No parser for content type {:?} of {}",
                page.content_type,
                page.web_url
            );
            return false;
        };

        let strategy = factory();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            strategy.parse(page, &self.config)
        }));

        match outcome {
            Ok(Ok(data)) => {
                page.parse_data = Some(data);
                true
            }
            Ok(Err(e)) => {
                tracing::warn!("Failed to parse {}: {}", page.web_url, e);
                false
            }
            Err(_) => {
                tracing::error!("Parser panicked on {}", page.web_url);
                false
            }
        }
    }

    /// Looks up the strategy for `content_type`, falling back to binary when enabled
    fn resolve(&self, content_type: Option<&str>) -> Option<StrategyFactory> {
        if let Some(factory) = content_type.and_then(|mime| self.registry.lookup(mime)) {
            return Some(factory);
        }

        if !self.config.include_binary_content {
            return None;
        }

        self.registry.lookup(BINARY_CONTENT_TYPE)
    }
}
