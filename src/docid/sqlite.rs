//! SQLite-backed document-id store
//!
//! Ids written here survive restarts, so a later run with the same database
//! skips every URL an earlier run already claimed.

use crate::docid::schema::{initialize_schema, open_database};
use crate::docid::{Allocation, DocIdServer, StorageResult};
use crate::url::DocId;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite document-id backend
pub struct SqliteDocIdServer {
    inner: Mutex<SqliteIds>,
}

struct SqliteIds {
    conn: Connection,
    last_doc_id: DocId,
}

impl SqliteDocIdServer {
    /// Opens or creates the database at `path`
    pub fn open(path: &Path) -> StorageResult<Self> {
        Self::from_connection(open_database(path)?)
    }

    /// Creates a database that lives only as long as this value
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        initialize_schema(&conn)?;

        let last_doc_id: DocId =
            conn.query_row("SELECT COALESCE(MAX(doc_id), 0) FROM doc_ids", [], |row| {
                row.get(0)
            })?;

        tracing::debug!("Opened doc-id store, last assigned id {}", last_doc_id);

        Ok(Self {
            inner: Mutex::new(SqliteIds { conn, last_doc_id }),
        })
    }

    /// Removes every stored id; used to start a fresh crawl
    ///
    /// The id counter is not reset, so ids handed out before the clear are never reused
    /// within this process.
    pub fn clear(&self) -> StorageResult<()> {
        let inner = self.inner.lock();
        let removed = inner.conn.execute("DELETE FROM doc_ids", [])?;
        tracing::info!("Cleared {} stored document ids", removed);
        Ok(())
    }
}

impl DocIdServer for SqliteDocIdServer {
    fn get_doc_id(&self, url: &str) -> StorageResult<Option<DocId>> {
        let inner = self.inner.lock();
        let id = inner
            .conn
            .query_row(
                "SELECT doc_id FROM doc_ids WHERE url = ?1",
                params![url],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn get_or_allocate(&self, url: &str) -> StorageResult<Allocation> {
        // Lookup and insert share one lock
        let mut inner = self.inner.lock();

        let existing: Option<DocId> = inner
            .conn
            .query_row(
                "SELECT doc_id FROM doc_ids WHERE url = ?1",
                params![url],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            return Ok(Allocation::Existing(id));
        }

        let id = inner.last_doc_id + 1;
        inner.conn.execute(
            "INSERT INTO doc_ids (url, doc_id, assigned_at) VALUES (?1, ?2, ?3)",
            params![url, id, Utc::now().to_rfc3339()],
        )?;
        inner.last_doc_id = id;

        Ok(Allocation::New(id))
    }

    fn len(&self) -> StorageResult<usize> {
        let inner = self.inner.lock();
        let count: i64 = inner
            .conn
            .query_row("SELECT COUNT(*) FROM doc_ids", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
