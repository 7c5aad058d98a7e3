//! Crawl controller
//!
//! Owns the collaborators of one crawl session, seeds the frontier, runs the
//! workers, and decides when the crawl is over.

use crate::config::{Config, CrawlerConfig};
use crate::crawler::{CrawlContext, WebCrawler, Worker, WorkerState, WorkerStatus};
use crate::docid::{Allocation, DocIdServer, InMemoryDocIdServer, SqliteDocIdServer};
use crate::fetcher::{build_http_client, FetchTransport, HttpFetcher};
use crate::frontier::{Frontier, InMemoryFrontier, SqliteFrontier};
use crate::parser::ContentTypeRegistry;
use crate::robots::{PolitenessOracle, RobotstxtServer};
use crate::stats::CrawlStats;
use crate::url::{canonicalize, DocId, WebUrl};
use crate::CrawlError;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// How often the controller checks whether the crawl is done
const MONITOR_INTERVAL: Duration = Duration::from_millis(250);

const PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

/// Runs a crawl session
///
/// # Example
///
/// ```no_run
/// use webweave::config::load_config;
/// use webweave::{CrawlController, Page, WebCrawler};
/// use std::path::Path;
///
/// struct TitlePrinter;
///
/// impl WebCrawler for TitlePrinter {
///     fn visit(&mut self, page: &Page) -> anyhow::Result<()> {
///         if let Some(html) = page.html() {
///             println!("{}: {}", page.web_url, html.title);
///         }
///         Ok(())
///     }
/// }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let controller = CrawlController::from_config(&config, false)?;
/// controller.add_seed("https://example.com/").await?;
/// controller.start(|| TitlePrinter, 4).await?;
/// # Ok(())
/// # }
/// ```
pub struct CrawlController {
    context: Arc<CrawlContext>,
    shutdown: watch::Sender<bool>,
}

impl CrawlController {
    /// Creates a controller over the given collaborators
    pub fn new(
        config: CrawlerConfig,
        doc_ids: Arc<dyn DocIdServer>,
        frontier: Arc<dyn Frontier>,
        oracle: Arc<dyn PolitenessOracle>,
        transport: Arc<dyn FetchTransport>,
        registry: Arc<ContentTypeRegistry>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            context: Arc::new(CrawlContext {
                config: Arc::new(config),
                doc_ids,
                frontier,
                oracle,
                transport,
                registry,
                stats: Arc::new(CrawlStats::new()),
            }),
            shutdown,
        }
    }

    /// Wires the HTTP fetcher, robots.txt oracle, and default parsers from a loaded config
    ///
    /// When `storage.doc-id-database` is set, document ids and the frontier are
    /// both kept in that SQLite file: later runs skip everything already seen
    /// and pick up the URLs an interrupted run left queued. `fresh` clears both
    /// first.
    pub fn from_config(config: &Config, fresh: bool) -> Result<Self, CrawlError> {
        let client = build_http_client(&config.user_agent)?;

        let (doc_ids, frontier): (Arc<dyn DocIdServer>, Arc<dyn Frontier>) =
            match &config.storage.doc_id_database {
                Some(path) => {
                    let path = Path::new(path);
                    let doc_ids = SqliteDocIdServer::open(path)?;
                    let frontier = if fresh {
                        tracing::info!("Clearing crawl state in {}", path.display());
                        doc_ids.clear()?;
                        SqliteFrontier::open_fresh(path)?
                    } else {
                        SqliteFrontier::open(path)?
                    };
                    (Arc::new(doc_ids), Arc::new(frontier))
                }
                None => (
                    Arc::new(InMemoryDocIdServer::new()),
                    Arc::new(InMemoryFrontier::new()),
                ),
            };

        let oracle = RobotstxtServer::new(
            client.clone(),
            &config.robots,
            config.user_agent.crawler_name.clone(),
        );
        let transport = HttpFetcher::new(client, &config.crawler);

        Ok(Self::new(
            config.crawler.clone(),
            doc_ids,
            frontier,
            Arc::new(oracle),
            Arc::new(transport),
            Arc::new(ContentTypeRegistry::with_defaults()),
        ))
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.context.config
    }

    pub fn doc_ids(&self) -> &Arc<dyn DocIdServer> {
        &self.context.doc_ids
    }

    pub fn frontier(&self) -> &Arc<dyn Frontier> {
        &self.context.frontier
    }

    /// Registry shared by all workers; changes apply to later parses
    pub fn registry(&self) -> &Arc<ContentTypeRegistry> {
        &self.context.registry
    }

    pub fn stats(&self) -> &Arc<CrawlStats> {
        &self.context.stats
    }

    /// Schedules a seed URL at depth 0
    ///
    /// # Returns
    ///
    /// * `Ok(Some(doc_id))` - The seed was scheduled
    /// * `Ok(None)` - The seed was already seen or is disallowed
    /// * `Err(CrawlError)` - The URL is invalid or the allocator failed
    pub async fn add_seed(&self, url: &str) -> Result<Option<DocId>, CrawlError> {
        let canonical = canonicalize(url)?.to_string();

        if let Some(doc_id) = self.context.doc_ids.get_doc_id(&canonical)? {
            tracing::info!("Seed {} already seen (doc {}), skipping", canonical, doc_id);
            return Ok(None);
        }

        if !self.context.oracle.is_allowed(&WebUrl::new(canonical.clone())).await {
            tracing::info!("Seed {} disallowed by robots.txt", canonical);
            return Ok(None);
        }

        match self.context.doc_ids.get_or_allocate(&canonical)? {
            Allocation::New(doc_id) => {
                tracing::debug!("Seeding {} as doc {}", canonical, doc_id);
                self.context.frontier.schedule(WebUrl::seed(canonical, doc_id));
                Ok(Some(doc_id))
            }
            Allocation::Existing(_) => Ok(None),
        }
    }

    /// Asks all workers to stop after their current URL
    pub fn shutdown(&self) {
        tracing::info!("Shutdown requested");
        self.shutdown.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Runs `number_of_crawlers` workers until the crawl is done or shut down
    ///
    /// Returns the crawler instances of the workers that exited normally.
    pub async fn start<C, F>(&self, factory: F, number_of_crawlers: usize) -> Result<Vec<C>, CrawlError>
    where
        C: WebCrawler,
        F: Fn() -> C,
    {
        if number_of_crawlers == 0 {
            return Err(CrawlError::Worker(
                "number of crawlers must be at least 1".to_string(),
            ));
        }

        let mut handles = Vec::with_capacity(number_of_crawlers);
        let mut statuses = Vec::with_capacity(number_of_crawlers);

        for id in 0..number_of_crawlers {
            let status = Arc::new(WorkerStatus::new());
            let worker = Worker::new(
                id,
                factory(),
                Arc::clone(&self.context),
                Arc::clone(&status),
                self.shutdown.subscribe(),
            );
            handles.push(tokio::spawn(worker.run()));
            statuses.push(status);
        }

        tracing::info!(
            "Started {} crawl workers, {} URLs queued",
            number_of_crawlers,
            self.context.frontier.queue_len()
        );

        self.monitor(&statuses).await;

        let mut crawlers = Vec::with_capacity(number_of_crawlers);
        for (id, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(crawler) => crawlers.push(crawler),
                Err(e) => tracing::error!("Worker {} failed: {}", id, e),
            }
        }

        let stats = self.context.stats.snapshot();
        tracing::info!(
            "Crawl finished: {} URLs processed, {} pages visited, {} still queued",
            stats.pages_processed,
            stats.pages_visited,
            self.context.frontier.queue_len()
        );

        Ok(crawlers)
    }

    /// Returns true when no queued or in-flight work remains and no worker is busy
    fn is_quiescent(&self, statuses: &[Arc<WorkerStatus>]) -> bool {
        self.context.frontier.is_finished() && statuses.iter().all(|status| !status.is_busy())
    }

    /// Waits until the workers exit, finishing the frontier once the crawl is quiescent
    async fn monitor(&self, statuses: &[Arc<WorkerStatus>]) {
        let started = Instant::now();
        let mut last_report = started;

        loop {
            tokio::time::sleep(MONITOR_INTERVAL).await;

            if statuses
                .iter()
                .all(|status| status.get() == WorkerState::Terminated)
            {
                break;
            }

            if last_report.elapsed() >= PROGRESS_INTERVAL {
                let processed = self.context.stats.snapshot().pages_processed;
                tracing::info!(
                    "Progress: {} URLs processed, {} in frontier, {:.2} pages/sec",
                    processed,
                    self.context.frontier.queue_len(),
                    processed as f64 / started.elapsed().as_secs_f64()
                );
                last_report = Instant::now();
            }

            if self.is_shutdown() || !self.is_quiescent(statuses) {
                continue;
            }

            // A worker may have been between dequeue and status update
            tokio::time::sleep(MONITOR_INTERVAL).await;
            if self.is_quiescent(statuses) {
                tracing::info!("Frontier empty and all workers idle, finishing crawl");
                self.context.frontier.finish();
            }
        }
    }
}
