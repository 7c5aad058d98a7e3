//! Frontier journaled to SQLite
//!
//! Every scheduled record is written to a `frontier` table and deleted once it
//! is acknowledged. Rows still present when the database is reopened are the
//! records an interrupted run scheduled but never finished, and they are
//! queued again.

use crate::docid::{open_database, StorageResult};
use crate::frontier::{Frontier, InMemoryFrontier};
use crate::url::{Depth, WebUrl};
use parking_lot::Mutex;
use rusqlite::{params, Connection, Row};
use std::path::Path;

const FRONTIER_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS frontier (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    doc_id INTEGER,
    parent_doc_id INTEGER,
    parent_url TEXT,
    depth INTEGER NOT NULL,
    anchor TEXT
);
"#;

/// [`InMemoryFrontier`] whose unacknowledged records survive restarts
///
/// Queue order and completion come from the in-memory frontier; the table
/// only mirrors which records are still owed a visit.
pub struct SqliteFrontier {
    memory: InMemoryFrontier,
    conn: Mutex<Connection>,
}

impl SqliteFrontier {
    /// Opens the journal at `path` and queues every record left over from earlier runs
    pub fn open(path: &Path) -> StorageResult<Self> {
        Self::from_connection(open_database(path)?)
    }

    /// Opens the journal at `path`, discarding records left by earlier runs
    pub fn open_fresh(path: &Path) -> StorageResult<Self> {
        let conn = open_database(path)?;
        conn.execute_batch(FRONTIER_SCHEMA_SQL)?;
        let removed = conn.execute("DELETE FROM frontier", [])?;
        tracing::info!("Discarded {} journaled frontier records", removed);
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        conn.execute_batch(FRONTIER_SCHEMA_SQL)?;

        let pending = {
            let mut stmt = conn.prepare(
                "SELECT url, doc_id, parent_doc_id, parent_url, depth, anchor
                 FROM frontier ORDER BY seq",
            )?;
            let rows = stmt.query_map([], record_from_row)?;
            rows.collect::<rusqlite::Result<Vec<WebUrl>>>()?
        };

        if !pending.is_empty() {
            tracing::info!("Resuming {} URLs left in the frontier", pending.len());
        }

        let memory = InMemoryFrontier::new();
        memory.schedule_all(pending);

        Ok(Self {
            memory,
            conn: Mutex::new(conn),
        })
    }

    /// Number of records scheduled and not yet acknowledged, across runs
    pub fn journaled(&self) -> StorageResult<usize> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM frontier", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn journal(&self, urls: &[WebUrl]) {
        let mut conn = self.conn.lock();
        if let Err(e) = insert_records(&mut conn, urls) {
            tracing::error!("Failed to journal {} frontier records: {}", urls.len(), e);
        }
    }
}

fn insert_records(conn: &mut Connection, urls: &[WebUrl]) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare_cached(
            "INSERT OR IGNORE INTO frontier (url, doc_id, parent_doc_id, parent_url, depth, anchor)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for url in urls {
            stmt.execute(params![
                url.url,
                url.doc_id,
                url.parent_doc_id,
                url.parent_url,
                encode_depth(url.depth),
                url.anchor,
            ])?;
        }
    }
    tx.commit()
}

fn encode_depth(depth: Depth) -> i64 {
    match depth {
        Depth::Fresh(hops) => i64::from(hops),
        Depth::AlreadySeen => -1,
    }
}

fn decode_depth(value: i64) -> Depth {
    u32::try_from(value).map_or(Depth::AlreadySeen, Depth::Fresh)
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<WebUrl> {
    Ok(WebUrl {
        url: row.get(0)?,
        doc_id: row.get(1)?,
        parent_doc_id: row.get(2)?,
        parent_url: row.get(3)?,
        depth: decode_depth(row.get(4)?),
        anchor: row.get(5)?,
    })
}

impl Frontier for SqliteFrontier {
    fn schedule(&self, url: WebUrl) {
        self.journal(std::slice::from_ref(&url));
        self.memory.schedule(url);
    }

    fn schedule_all(&self, urls: Vec<WebUrl>) {
        if urls.is_empty() {
            return;
        }
        self.journal(&urls);
        self.memory.schedule_all(urls);
    }

    fn dequeue_batch(&self, max: usize) -> Vec<WebUrl> {
        self.memory.dequeue_batch(max)
    }

    fn acknowledge_processed(&self, url: &WebUrl) {
        let deleted = self
            .conn
            .lock()
            .execute("DELETE FROM frontier WHERE url = ?1", params![url.url]);
        if let Err(e) = deleted {
            tracing::error!("Failed to remove {} from the frontier journal: {}", url, e);
        }
        self.memory.acknowledge_processed(url);
    }

    fn return_unprocessed(&self, urls: Vec<WebUrl>) {
        // Their rows were never deleted
        self.memory.return_unprocessed(urls);
    }

    fn is_finished(&self) -> bool {
        self.memory.is_finished()
    }

    fn finish(&self) {
        self.memory.finish();
    }

    fn queue_len(&self) -> usize {
        self.memory.queue_len()
    }

    fn in_process(&self) -> usize {
        self.memory.in_process()
    }
}
