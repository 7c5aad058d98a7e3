//! Crawl worker
//!
//! Each worker loops over batches taken from the frontier and runs every URL
//! through the same pipeline:
//! 1. Fetch headers and report the status
//! 2. Follow or drop redirects and other non-success responses
//! 3. Adopt the final URL if the fetch landed somewhere else
//! 4. Fetch the body and parse it
//! 5. Allocate ids for new links and schedule them in one batch
//! 6. Hand the page to the user's `visit` hook
//!
//! Every dequeued record is acknowledged exactly once and any pending
//! response body is released, whatever the outcome.

use crate::config::CrawlerConfig;
use crate::crawler::{Page, WebCrawler};
use crate::docid::{Allocation, DocIdServer};
use crate::fetcher::{FetchResponse, FetchStatus, FetchTransport};
use crate::frontier::Frontier;
use crate::parser::{ContentTypeRegistry, ParseData, Parser};
use crate::robots::PolitenessOracle;
use crate::stats::CrawlStats;
use crate::url::{canonicalize, Depth, WebUrl};
use crate::CrawlError;
use futures::FutureExt;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Collaborators shared by every worker of a crawl
pub struct CrawlContext {
    pub config: Arc<CrawlerConfig>,
    pub doc_ids: Arc<dyn DocIdServer>,
    pub frontier: Arc<dyn Frontier>,
    pub oracle: Arc<dyn PolitenessOracle>,
    pub transport: Arc<dyn FetchTransport>,
    pub registry: Arc<ContentTypeRegistry>,
    pub stats: Arc<CrawlStats>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    /// Between batches, or waiting for work to appear
    Idle = 0,
    Dequeuing = 1,
    Processing = 2,
    Terminated = 3,
}

/// Worker state readable from other tasks
#[derive(Debug, Default)]
pub struct WorkerStatus(AtomicU8);

impl WorkerStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> WorkerState {
        match self.0.load(Ordering::SeqCst) {
            0 => WorkerState::Idle,
            1 => WorkerState::Dequeuing,
            2 => WorkerState::Processing,
            _ => WorkerState::Terminated,
        }
    }

    fn set(&self, state: WorkerState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    /// Returns true while the worker may hold dequeued records
    pub fn is_busy(&self) -> bool {
        matches!(self.get(), WorkerState::Dequeuing | WorkerState::Processing)
    }
}

/// How the pipeline ended for one URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// The page reached the visit hook
    Visited {
        links_scheduled: usize,
        callback_failed: bool,
    },

    /// A redirect response; `scheduled` is true if its target was queued
    Redirected { scheduled: bool },

    /// Any other non-success status
    StatusRejected(u16),

    PageTooBig,

    /// The fetch ended on a URL that already has an id
    Duplicate,

    ContentFetchError,
    ParseError,
    UnexpectedError,
}

/// Acknowledges a dequeued record when dropped, including during unwinding
struct Acknowledgement {
    frontier: Arc<dyn Frontier>,
    url: WebUrl,
}

impl Drop for Acknowledgement {
    fn drop(&mut self) {
        self.frontier.acknowledge_processed(&self.url);
    }
}

/// The part of a dequeued batch not yet handed to the pipeline
///
/// Whatever is left when this is dropped goes back to the frontier, so a
/// worker that stops mid-batch for any reason leaves nothing in process.
struct PendingBatch {
    frontier: Arc<dyn Frontier>,
    urls: VecDeque<WebUrl>,
}

impl PendingBatch {
    fn next(&mut self) -> Option<WebUrl> {
        self.urls.pop_front()
    }

    fn len(&self) -> usize {
        self.urls.len()
    }

    fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

impl Drop for PendingBatch {
    fn drop(&mut self) {
        if !self.urls.is_empty() {
            self.frontier
                .return_unprocessed(self.urls.drain(..).collect());
        }
    }
}

/// Publishes [`WorkerState::Terminated`] when the worker's task ends, however it ends
struct TerminateOnDrop(Arc<WorkerStatus>);

impl Drop for TerminateOnDrop {
    fn drop(&mut self) {
        self.0.set(WorkerState::Terminated);
    }
}

/// One crawl worker, driving a [`WebCrawler`] instance
pub struct Worker<C: WebCrawler> {
    id: usize,
    crawler: C,
    context: Arc<CrawlContext>,
    parser: Parser,
    status: Arc<WorkerStatus>,
    shutdown: watch::Receiver<bool>,
}

impl<C: WebCrawler> Worker<C> {
    pub fn new(
        id: usize,
        crawler: C,
        context: Arc<CrawlContext>,
        status: Arc<WorkerStatus>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let parser = Parser::new(Arc::clone(&context.registry), Arc::clone(&context.config));
        Self {
            id,
            crawler,
            context,
            parser,
            status,
            shutdown,
        }
    }

    /// Runs the batch loop until the frontier is exhausted or shutdown is signalled
    ///
    /// Returns the crawler instance so callers can collect its local data.
    pub async fn run(mut self) -> C {
        let _terminated = TerminateOnDrop(Arc::clone(&self.status));

        tracing::debug!("Worker {} starting", self.id);
        self.status.set(WorkerState::Idle);
        self.crawler.on_start();

        'crawl: loop {
            if self.is_shutdown() {
                tracing::info!("Worker {} observed shutdown", self.id);
                break;
            }

            self.status.set(WorkerState::Dequeuing);
            let batch = self
                .context
                .frontier
                .dequeue_batch(self.context.config.batch_size);

            if batch.is_empty() {
                self.status.set(WorkerState::Idle);
                if self.context.frontier.is_finished() {
                    tracing::debug!("Worker {}: frontier finished", self.id);
                    break;
                }
                if self.idle_wait().await {
                    tracing::info!("Worker {} observed shutdown while idle", self.id);
                    break;
                }
                continue;
            }

            self.status.set(WorkerState::Processing);
            let mut pending = PendingBatch {
                frontier: Arc::clone(&self.context.frontier),
                urls: batch.into(),
            };

            while let Some(url) = pending.next() {
                let outcome = self.process_page_isolated(url).await;
                self.context.stats.record(&outcome);

                if self.is_shutdown() {
                    if !pending.is_empty() {
                        tracing::info!(
                            "Worker {} returning {} unprocessed URLs",
                            self.id,
                            pending.len()
                        );
                    }
                    break 'crawl;
                }
            }

            self.status.set(WorkerState::Idle);
        }

        self.status.set(WorkerState::Terminated);
        self.crawler.on_before_exit();
        tracing::debug!("Worker {} terminated", self.id);
        self.crawler
    }

    /// Runs [`process_page`](Self::process_page), turning a panic anywhere in
    /// the pipeline into [`PageOutcome::UnexpectedError`]
    ///
    /// The record is acknowledged either way.
    async fn process_page_isolated(&mut self, url: WebUrl) -> PageOutcome {
        let target = url.url.clone();

        match AssertUnwindSafe(self.process_page(url)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(payload) => {
                tracing::error!(
                    "Worker {} panicked while processing {}: {}",
                    self.id,
                    target,
                    panic_message(payload.as_ref())
                );
                PageOutcome::UnexpectedError
            }
        }
    }

    fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Sleeps for the idle interval; returns true if shutdown was signalled meanwhile
    async fn idle_wait(&mut self) -> bool {
        let wait = Duration::from_millis(self.context.config.idle_wait);

        let changed = tokio::select! {
            _ = tokio::time::sleep(wait) => return false,
            changed = self.shutdown.changed() => changed,
        };

        changed.is_err() || *self.shutdown.borrow()
    }

    /// Runs the pipeline for one dequeued record and acknowledges it
    pub async fn process_page(&mut self, url: WebUrl) -> PageOutcome {
        let _ack = Acknowledgement {
            frontier: Arc::clone(&self.context.frontier),
            url: url.clone(),
        };

        let mut url = url;
        let mut fetch: Option<FetchResponse> = None;

        let outcome = match self.try_process_page(&mut url, &mut fetch).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Unexpected error while processing {}: {}", url, e);
                self.crawler.on_unexpected_error(&url, &e);
                PageOutcome::UnexpectedError
            }
        };

        if let Some(response) = fetch.as_mut() {
            response.discard_content_if_not_consumed();
        }

        outcome
    }

    async fn try_process_page(
        &mut self,
        url: &mut WebUrl,
        fetch: &mut Option<FetchResponse>,
    ) -> Result<PageOutcome, CrawlError> {
        tracing::debug!("Processing {}", url);

        let response = fetch.insert(self.context.transport.fetch_header(url).await?);
        let status = response.status;
        self.crawler
            .handle_page_status_code(url, status.code(), status.description());

        if !status.is_success() {
            if status.is_redirect() {
                let moved_to = response.moved_to_url.clone();
                return self.handle_redirect(url, moved_to).await;
            }

            if status == FetchStatus::PageTooBig {
                return Ok(self.page_too_big(url));
            }

            tracing::debug!("Skipping {}: {}", url, status);
            return Ok(PageOutcome::StatusRejected(status.code()));
        }

        let fetched_url = canonicalize(&response.fetched_url)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| response.fetched_url.clone());

        if fetched_url != url.url {
            if self.context.doc_ids.is_seen_before(&fetched_url)? {
                tracing::debug!("Redirect page {} has already been seen", fetched_url);
                return Ok(PageOutcome::Duplicate);
            }

            match self.context.doc_ids.get_or_allocate(&fetched_url)? {
                Allocation::New(doc_id) => {
                    url.url = fetched_url;
                    url.doc_id = Some(doc_id);
                }
                Allocation::Existing(_) => return Ok(PageOutcome::Duplicate),
            }
        }

        let max_size = self.context.config.max_download_size;
        let content = match response.fetch_content(max_size).await {
            Ok(content) => content,
            Err(CrawlError::PageTooBig { .. }) => return Ok(self.page_too_big(url)),
            Err(e) => {
                tracing::warn!("Failed to fetch content of {}: {}", url, e);
                self.crawler.on_content_fetch_error(url);
                return Ok(PageOutcome::ContentFetchError);
            }
        };

        let mut page = Page::new(
            url.clone(),
            status.code(),
            content,
            response.content_type.clone(),
            response.content_charset.clone(),
        );

        if !self.parser.parse(&mut page) {
            self.crawler.on_parse_error(url);
            return Ok(PageOutcome::ParseError);
        }

        let links_scheduled = self.expand_links(&mut page).await?;
        let callback_failed = !self.visit(&page);

        Ok(PageOutcome::Visited {
            links_scheduled,
            callback_failed,
        })
    }

    fn page_too_big(&mut self, url: &WebUrl) -> PageOutcome {
        let limit = self.context.config.max_download_size;
        tracing::info!("Skipping {}: larger than {} bytes", url, limit);
        self.crawler.on_page_too_big(url, limit);
        PageOutcome::PageTooBig
    }

    async fn handle_redirect(
        &mut self,
        url: &WebUrl,
        moved_to: Option<String>,
    ) -> Result<PageOutcome, CrawlError> {
        const NOT_SCHEDULED: PageOutcome = PageOutcome::Redirected { scheduled: false };

        if !self.context.config.follow_redirects {
            tracing::debug!("Not following redirect from {}", url);
            return Ok(NOT_SCHEDULED);
        }

        let Some(moved_to) = moved_to else {
            tracing::warn!("{} redirects without a usable Location", url);
            return Ok(NOT_SCHEDULED);
        };

        if self.context.doc_ids.is_seen_before(&moved_to)? {
            tracing::debug!("Redirect target {} has already been seen", moved_to);
            return Ok(NOT_SCHEDULED);
        }

        let mut target = url.redirect_target(moved_to);
        if !self.should_schedule(&target).await {
            return Ok(NOT_SCHEDULED);
        }

        match self.context.doc_ids.get_or_allocate(&target.url)? {
            Allocation::New(doc_id) => {
                target.doc_id = Some(doc_id);
                tracing::debug!("Following redirect {} -> {}", url, target);
                self.context.frontier.schedule(target);
                Ok(PageOutcome::Redirected { scheduled: true })
            }
            Allocation::Existing(_) => Ok(NOT_SCHEDULED),
        }
    }

    /// Stamps provenance on the page's links and schedules the new ones
    async fn expand_links(&mut self, page: &mut Page) -> Result<usize, CrawlError> {
        let Some(ParseData::Html(html)) = page.parse_data.as_mut() else {
            return Ok(0);
        };

        let parent = &page.web_url;
        let parent_depth = parent.depth.hops().unwrap_or(0);
        let max_depth = self.context.config.max_depth;
        let within_depth = max_depth < 0 || i64::from(parent_depth) < i64::from(max_depth);

        let mut to_schedule = Vec::new();

        for link in html.outgoing_urls.iter_mut() {
            link.parent_doc_id = parent.doc_id;
            link.parent_url = Some(parent.url.clone());

            if let Some(doc_id) = self.context.doc_ids.get_doc_id(&link.url)? {
                link.depth = Depth::AlreadySeen;
                link.doc_id = Some(doc_id);
                continue;
            }

            link.depth = Depth::Fresh(parent_depth + 1);

            if !within_depth || !self.should_schedule(link).await {
                continue;
            }

            match self.context.doc_ids.get_or_allocate(&link.url)? {
                Allocation::New(doc_id) => {
                    link.doc_id = Some(doc_id);
                    to_schedule.push(link.clone());
                }
                Allocation::Existing(doc_id) => {
                    link.depth = Depth::AlreadySeen;
                    link.doc_id = Some(doc_id);
                }
            }
        }

        let scheduled = to_schedule.len();
        if scheduled > 0 {
            tracing::debug!("Scheduling {} links from {}", scheduled, parent);
            self.context.frontier.schedule_all(to_schedule);
        }

        Ok(scheduled)
    }

    /// User filter and politeness oracle, both must allow
    async fn should_schedule(&mut self, url: &WebUrl) -> bool {
        if !self.crawler.should_visit(url) {
            return false;
        }
        self.context.oracle.is_allowed(url).await
    }

    /// Calls the visit hook; returns false if it failed or panicked
    fn visit(&mut self, page: &Page) -> bool {
        let crawler = &mut self.crawler;
        match panic::catch_unwind(AssertUnwindSafe(|| crawler.visit(page))) {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::error!("visit failed for {}: {:#}", page.web_url, e);
                false
            }
            Err(payload) => {
                tracing::error!(
                    "visit panicked for {}: {}",
                    page.web_url,
                    panic_message(payload.as_ref())
                );
                false
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
