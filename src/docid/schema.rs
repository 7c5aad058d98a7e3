//! Database schema for the document-id store

use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per canonical URL that has ever received a document id
CREATE TABLE IF NOT EXISTS doc_ids (
    url TEXT PRIMARY KEY,
    doc_id INTEGER NOT NULL UNIQUE,
    assigned_at TEXT NOT NULL
);
"#;

/// Opens a crawl database file in WAL mode
///
/// The doc-id store and the persistent frontier each hold a connection to the
/// same file, so writers wait on each other instead of failing with `SQLITE_BUSY`.
pub fn open_database(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA temp_store = MEMORY;
    ",
    )?;
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(conn)
}

/// Initializes the database schema
pub fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_creation() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='doc_ids'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        initialize_schema(&conn).unwrap();
    }
}
