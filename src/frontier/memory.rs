//! In-memory FIFO frontier

use crate::frontier::Frontier;
use crate::url::WebUrl;
use parking_lot::Mutex;
use std::collections::VecDeque;

#[derive(Debug, Default)]
struct FrontierState {
    queue: VecDeque<WebUrl>,
    in_process: usize,
    finished: bool,
}

/// FIFO frontier kept in process memory
///
/// Queue, in-process count, and finished flag share one lock so that
/// [`is_finished`](Frontier::is_finished) sees a consistent snapshot.
#[derive(Debug, Default)]
pub struct InMemoryFrontier {
    state: Mutex<FrontierState>,
}

impl InMemoryFrontier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Frontier for InMemoryFrontier {
    fn schedule(&self, url: WebUrl) {
        self.state.lock().queue.push_back(url);
    }

    fn schedule_all(&self, urls: Vec<WebUrl>) {
        if urls.is_empty() {
            return;
        }
        self.state.lock().queue.extend(urls);
    }

    fn dequeue_batch(&self, max: usize) -> Vec<WebUrl> {
        let mut state = self.state.lock();
        if state.finished {
            return Vec::new();
        }

        let count = max.min(state.queue.len());
        let batch: Vec<WebUrl> = state.queue.drain(..count).collect();
        state.in_process += batch.len();
        batch
    }

    fn acknowledge_processed(&self, url: &WebUrl) {
        let mut state = self.state.lock();
        if state.in_process == 0 {
            tracing::warn!("Acknowledged {} with nothing in process", url);
            return;
        }
        state.in_process -= 1;
    }

    fn return_unprocessed(&self, urls: Vec<WebUrl>) {
        let mut state = self.state.lock();
        state.in_process = state.in_process.saturating_sub(urls.len());
        for url in urls.into_iter().rev() {
            state.queue.push_front(url);
        }
    }

    fn is_finished(&self) -> bool {
        let state = self.state.lock();
        state.finished || (state.queue.is_empty() && state.in_process == 0)
    }

    fn finish(&self) {
        self.state.lock().finished = true;
    }

    fn queue_len(&self) -> usize {
        self.state.lock().queue.len()
    }

    fn in_process(&self) -> usize {
        self.state.lock().in_process
    }
}
