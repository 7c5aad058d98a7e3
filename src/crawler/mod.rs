//! Crawler module: pages, user hooks, workers, and the controller
//!
//! This module contains the core crawling logic, including:
//! - The per-URL worker pipeline and its batch loop
//! - The [`WebCrawler`] hooks users implement
//! - Crawl session setup and completion detection

mod callbacks;
mod controller;
mod page;
mod worker;

pub use callbacks::WebCrawler;
pub use controller::CrawlController;
pub use page::Page;
pub use worker::{CrawlContext, PageOutcome, Worker, WorkerState, WorkerStatus};
