//! Crawl frontier
//!
//! The frontier holds URL records waiting to be fetched and tracks how many
//! have been handed to workers but not yet acknowledged. Completion is only
//! reported when both the queue is empty and nothing is in process, since a
//! worker holding a record can still discover more work.

mod memory;
mod sqlite;

pub use memory::InMemoryFrontier;
pub use sqlite::SqliteFrontier;

use crate::url::WebUrl;

/// Concurrent work queue shared by all crawl workers
pub trait Frontier: Send + Sync {
    /// Enqueues one record
    fn schedule(&self, url: WebUrl);

    /// Enqueues many records under a single lock acquisition
    fn schedule_all(&self, urls: Vec<WebUrl>);

    /// Removes up to `max` records, marking each as in process
    ///
    /// May return fewer than requested, including none.
    fn dequeue_batch(&self, max: usize) -> Vec<WebUrl>;

    /// Marks a dequeued record as handled
    ///
    /// Must be called exactly once per dequeued record.
    fn acknowledge_processed(&self, url: &WebUrl);

    /// Puts dequeued but unprocessed records back at the front of the queue
    fn return_unprocessed(&self, urls: Vec<WebUrl>);

    /// Returns true once no queued or in-process work remains, or after [`finish`](Self::finish)
    fn is_finished(&self) -> bool;

    /// Declares the crawl over; later [`is_finished`](Self::is_finished) calls return true
    fn finish(&self);

    fn queue_len(&self) -> usize;

    /// Number of records dequeued and not yet acknowledged
    fn in_process(&self) -> usize;
}
