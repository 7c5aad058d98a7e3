//! Webweave main entry point
//!
//! This is the command-line interface for the Webweave crawler.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use webweave::config::{load_config_with_hash, Config};
use webweave::stats::print_statistics;
use webweave::{CrawlController, Page, WebCrawler, WebUrl};

/// Webweave: a polite, resumable web crawler
///
/// Webweave crawls outward from seed URLs while respecting robots.txt and
/// per-host politeness delays. Document ids can be kept in SQLite so that a
/// later run only fetches what it has not seen before.
#[derive(Parser, Debug)]
#[command(name = "webweave")]
#[command(version)]
#[command(about = "A polite, resumable web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Forget previously seen URLs before crawling
    #[arg(long)]
    fresh: bool,

    /// Additional seed URL (repeatable)
    #[arg(long = "seed", value_name = "URL")]
    seeds: Vec<String>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

/// Logs every visited page
#[derive(Debug, Default)]
struct LoggingCrawler {
    pages: u64,
    bytes: u64,
}

impl WebCrawler for LoggingCrawler {
    fn handle_page_status_code(&mut self, url: &WebUrl, status_code: u16, description: &str) {
        if status_code >= 400 {
            tracing::info!("{} answered {} {}", url, status_code, description);
        }
    }

    fn visit(&mut self, page: &Page) -> anyhow::Result<()> {
        self.pages += 1;
        self.bytes += page.content.len() as u64;

        match page.html() {
            Some(html) => tracing::info!(
                "Visited {} (depth {:?}): \"{}\", {} chars, {} links",
                page.web_url,
                page.web_url.depth,
                html.title,
                html.text.len(),
                html.outgoing_urls.len()
            ),
            None => tracing::info!(
                "Visited {} ({}, {} bytes)",
                page.web_url,
                page.content_type.as_deref().unwrap_or("unknown type"),
                page.content.len()
            ),
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    config.seeds.extend(cli.seeds);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config, cli.fresh).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("webweave=info,warn"),
            1 => EnvFilter::new("webweave=debug,info"),
            2 => EnvFilter::new("webweave=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration and seeds
fn handle_dry_run(config: &Config) {
    println!("=== Webweave Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Crawlers: {}", config.crawler.number_of_crawlers);
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Max outgoing links: {}", config.crawler.max_outgoing_links);
    println!("  Follow redirects: {}", config.crawler.follow_redirects);
    println!(
        "  Include binary content: {}",
        config.crawler.include_binary_content
    );
    println!(
        "  Max download size: {} bytes",
        config.crawler.max_download_size
    );
    println!("  Politeness delay: {}ms", config.crawler.politeness_delay);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nRobots:");
    println!("  Enabled: {}", config.robots.enabled);
    println!("  Cache TTL: {}h", config.robots.cache_ttl_hours);

    println!("\nStorage:");
    match &config.storage.doc_id_database {
        Some(path) => println!("  Document ids: {}", path),
        None => println!("  Document ids: in memory"),
    }

    println!("\nSeeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (forgetting previously seen URLs)");
    }

    let controller = Arc::new(CrawlController::from_config(&config, fresh)?);

    let mut scheduled = 0;
    for seed in &config.seeds {
        match controller.add_seed(seed).await {
            Ok(Some(_)) => scheduled += 1,
            Ok(None) => {}
            Err(e) => tracing::warn!("Ignoring seed {}: {}", seed, e),
        }
    }
    tracing::info!("Scheduled {} of {} seed URLs", scheduled, config.seeds.len());

    if controller.frontier().queue_len() == 0 {
        if config.seeds.is_empty() {
            anyhow::bail!("No seed URLs: add `seeds` to the config or pass --seed");
        }
        tracing::warn!("Nothing to crawl: every seed was already seen or disallowed");
    }

    let interrupt = Arc::clone(&controller);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing current pages");
            interrupt.shutdown();
        }
    });

    let crawlers = controller
        .start(LoggingCrawler::default, config.crawler.number_of_crawlers)
        .await?;

    let bytes: u64 = crawlers.iter().map(|c| c.bytes).sum();
    let pages: u64 = crawlers.iter().map(|c| c.pages).sum();
    tracing::info!("Crawl completed: {} pages, {} bytes", pages, bytes);

    println!();
    print_statistics(&controller.stats().snapshot());

    Ok(())
}
