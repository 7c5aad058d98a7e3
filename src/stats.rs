//! Crawl statistics
//!
//! Workers record the outcome of every processed URL in a shared
//! [`CrawlStats`]; a [`CrawlStatistics`] snapshot is printed at the end of a run.

use crate::crawler::PageOutcome;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared by all workers
#[derive(Debug, Default)]
pub struct CrawlStats {
    pages_processed: AtomicU64,
    pages_visited: AtomicU64,
    status_rejections: AtomicU64,
    redirects_followed: AtomicU64,
    pages_too_big: AtomicU64,
    duplicates: AtomicU64,
    content_fetch_errors: AtomicU64,
    parse_errors: AtomicU64,
    callback_errors: AtomicU64,
    unexpected_errors: AtomicU64,
    links_scheduled: AtomicU64,
}

/// Point-in-time copy of [`CrawlStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// URLs taken through the pipeline, whatever the outcome
    pub pages_processed: u64,

    /// Pages handed to the visit callback
    pub pages_visited: u64,

    pub status_rejections: u64,
    pub redirects_followed: u64,
    pub pages_too_big: u64,

    /// Fetches that landed on an already-known URL
    pub duplicates: u64,

    pub content_fetch_errors: u64,
    pub parse_errors: u64,
    pub callback_errors: u64,
    pub unexpected_errors: u64,

    /// New links and redirect targets added to the frontier
    pub links_scheduled: u64,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one pipeline run
    pub fn record(&self, outcome: &PageOutcome) {
        self.pages_processed.fetch_add(1, Ordering::Relaxed);

        let counter = match outcome {
            PageOutcome::Visited {
                links_scheduled,
                callback_failed,
            } => {
                self.links_scheduled
                    .fetch_add(*links_scheduled as u64, Ordering::Relaxed);
                if *callback_failed {
                    self.callback_errors.fetch_add(1, Ordering::Relaxed);
                }
                &self.pages_visited
            }
            PageOutcome::Redirected { scheduled: true } => {
                self.links_scheduled.fetch_add(1, Ordering::Relaxed);
                &self.redirects_followed
            }
            PageOutcome::Redirected { scheduled: false } => return,
            PageOutcome::StatusRejected(_) => &self.status_rejections,
            PageOutcome::PageTooBig => &self.pages_too_big,
            PageOutcome::Duplicate => &self.duplicates,
            PageOutcome::ContentFetchError => &self.content_fetch_errors,
            PageOutcome::ParseError => &self.parse_errors,
            PageOutcome::UnexpectedError => &self.unexpected_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CrawlStatistics {
        CrawlStatistics {
            pages_processed: self.pages_processed.load(Ordering::Relaxed),
            pages_visited: self.pages_visited.load(Ordering::Relaxed),
            status_rejections: self.status_rejections.load(Ordering::Relaxed),
            redirects_followed: self.redirects_followed.load(Ordering::Relaxed),
            pages_too_big: self.pages_too_big.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            content_fetch_errors: self.content_fetch_errors.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            callback_errors: self.callback_errors.load(Ordering::Relaxed),
            unexpected_errors: self.unexpected_errors.load(Ordering::Relaxed),
            links_scheduled: self.links_scheduled.load(Ordering::Relaxed),
        }
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  URLs processed: {}", stats.pages_processed);
    println!("  Pages visited: {}", stats.pages_visited);
    println!("  Links scheduled: {}", stats.links_scheduled);
    println!("  Redirects followed: {}", stats.redirects_followed);
    println!("  Duplicates skipped: {}", stats.duplicates);
    println!();

    let errors = [
        ("Rejected status", stats.status_rejections),
        ("Page too big", stats.pages_too_big),
        ("Content fetch error", stats.content_fetch_errors),
        ("Parse error", stats.parse_errors),
        ("Callback error", stats.callback_errors),
        ("Unexpected error", stats.unexpected_errors),
    ];

    let mut error_counts: Vec<_> = errors.iter().filter(|(_, count)| *count > 0).collect();
    if !error_counts.is_empty() {
        error_counts.sort_by(|a, b| b.1.cmp(&a.1));

        println!("Error Summary:");
        for (label, count) in error_counts {
            println!("  {}: {}", label, count);
        }
        println!();
    }

    let success_rate = if stats.pages_processed > 0 {
        (stats.pages_visited as f64 / stats.pages_processed as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} URLs visited)",
        success_rate, stats.pages_visited, stats.pages_processed
    );
}
