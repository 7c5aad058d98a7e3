//! Webweave: a polite, resumable web crawler
//!
//! This crate fetches pages concurrently from a shared frontier, deduplicates
//! URLs through a document-id allocator, respects robots.txt, dispatches
//! fetched content to pluggable parse strategies by MIME type, and hands the
//! parsed pages to caller-supplied callbacks.

pub mod config;
pub mod crawler;
pub mod docid;
pub mod fetcher;
pub mod frontier;
pub mod parser;
pub mod robots;
pub mod stats;
pub mod url;

use thiserror::Error;

/// Main error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Page {url} exceeds the maximum download size of {limit} bytes")]
    PageTooBig { url: String, limit: usize },

    #[error("Response body for {url} was already consumed")]
    ContentConsumed { url: String },

    #[error("Storage error: {0}")]
    Storage(#[from] docid::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Worker task failed: {0}")]
    Worker(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, CrawlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlController, Page, WebCrawler};
pub use parser::{ContentTypeRegistry, ParseData, Parser};
pub use url::{canonicalize, Depth, DocId, WebUrl};
