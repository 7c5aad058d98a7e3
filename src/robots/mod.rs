//! Robots.txt handling module
//!
//! This module provides the politeness oracle consulted before a newly
//! discovered URL is scheduled, plus the robots.txt fetching, parsing, and
//! caching that backs the default oracle.

mod rules;
mod server;

pub use rules::{CachedRobots, ParsedRobots};
pub use server::RobotstxtServer;

use crate::url::WebUrl;
use async_trait::async_trait;

/// Decides whether a URL may be crawled
///
/// Only consulted for URLs that do not have a document id yet.
#[async_trait]
pub trait PolitenessOracle: Send + Sync {
    /// Returns true if the crawl policy allows fetching this URL
    async fn is_allowed(&self, url: &WebUrl) -> bool;
}

/// Oracle that allows every URL
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl PolitenessOracle for AllowAll {
    async fn is_allowed(&self, _url: &WebUrl) -> bool {
        true
    }
}
