//! User hooks invoked by crawl workers

use crate::crawler::Page;
use crate::url::WebUrl;
use crate::CrawlError;

/// Caller-supplied crawl logic
///
/// Each worker owns its own instance, so implementations can keep local
/// state without locking; the instances are handed back when the crawl ends.
/// Every hook except [`visit`](Self::visit) defaults to doing nothing.
pub trait WebCrawler: Send + 'static {
    /// Called once when the worker starts
    fn on_start(&mut self) {}

    /// Called once before the worker exits
    fn on_before_exit(&mut self) {}

    /// Called for every header fetch, whatever the status
    fn handle_page_status_code(&mut self, _url: &WebUrl, _status_code: u16, _description: &str) {}

    fn on_content_fetch_error(&mut self, _url: &WebUrl) {}

    fn on_parse_error(&mut self, _url: &WebUrl) {}

    /// Called when a page exceeds the download limit of `limit` bytes
    fn on_page_too_big(&mut self, _url: &WebUrl, _limit: usize) {}

    /// Called when processing a URL failed for a reason the pipeline does not classify
    fn on_unexpected_error(&mut self, _url: &WebUrl, _error: &CrawlError) {}

    /// Filters URLs before they are scheduled
    ///
    /// Combined with the politeness oracle; both must allow a URL.
    fn should_visit(&self, _url: &WebUrl) -> bool {
        true
    }

    /// Consumes a fetched and parsed page
    ///
    /// Errors and panics are logged and do not affect the crawl.
    fn visit(&mut self, page: &Page) -> anyhow::Result<()>;
}
