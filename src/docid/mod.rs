//! Document-id allocation
//!
//! The allocator is the crawl's global deduplication oracle: every canonical
//! URL receives at most one document id for the lifetime of the crawl session
//! (and, with the SQLite backend, across sessions).
//!
//! `get_or_allocate` is the one operation every implementation must make
//! linearizable. When several workers race on the same URL exactly one of them
//! sees [`Allocation::New`]; that worker is the one allowed to schedule it.

mod schema;
mod sqlite;

pub use schema::open_database;
pub use sqlite::SqliteDocIdServer;

use crate::url::DocId;
use parking_lot::Mutex;
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur while reading or writing document ids
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Outcome of [`DocIdServer::get_or_allocate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allocation {
    /// This call assigned a fresh id
    New(DocId),

    /// The URL already had this id
    Existing(DocId),
}

impl Allocation {
    /// Returns the id regardless of who allocated it
    pub fn doc_id(&self) -> DocId {
        match self {
            Self::New(id) | Self::Existing(id) => *id,
        }
    }

    /// Returns true if this call performed the allocation
    pub fn is_new(&self) -> bool {
        matches!(self, Self::New(_))
    }
}

/// Maps canonical URLs to document ids
pub trait DocIdServer: Send + Sync {
    /// Looks up the id of a URL without allocating
    fn get_doc_id(&self, url: &str) -> StorageResult<Option<DocId>>;

    /// Returns the existing id of a URL, or atomically assigns a new one
    fn get_or_allocate(&self, url: &str) -> StorageResult<Allocation>;

    /// Returns the number of URLs with an id
    fn len(&self) -> StorageResult<usize>;

    /// Returns true if the URL already has an id
    fn is_seen_before(&self, url: &str) -> StorageResult<bool> {
        Ok(self.get_doc_id(url)?.is_some())
    }

    /// Returns true if no id has been assigned yet
    fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// Process-local allocator; ids start at 1
#[derive(Debug, Default)]
pub struct InMemoryDocIdServer {
    inner: Mutex<InMemoryIds>,
}

#[derive(Debug, Default)]
struct InMemoryIds {
    ids: HashMap<String, DocId>,
    last_doc_id: DocId,
}

impl InMemoryDocIdServer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocIdServer for InMemoryDocIdServer {
    fn get_doc_id(&self, url: &str) -> StorageResult<Option<DocId>> {
        Ok(self.inner.lock().ids.get(url).copied())
    }

    fn get_or_allocate(&self, url: &str) -> StorageResult<Allocation> {
        let mut inner = self.inner.lock();

        if let Some(&id) = inner.ids.get(url) {
            return Ok(Allocation::Existing(id));
        }

        inner.last_doc_id += 1;
        let id = inner.last_doc_id;
        inner.ids.insert(url.to_string(), id);
        Ok(Allocation::New(id))
    }

    fn len(&self) -> StorageResult<usize> {
        Ok(self.inner.lock().ids.len())
    }
}
