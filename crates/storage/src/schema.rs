use std::time::Duration;

use rusqlite::Connection;

use crate::error::StorageError;

pub const SCHEMA_VERSION: i32 = 1;

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

pub fn init_schema(conn: &Connection, busy_timeout: Duration) -> Result<(), StorageError> {
    conn.busy_timeout(busy_timeout)?;
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA cache_size = -8000;
    ",
    )?;
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, unixepoch())",
        [SCHEMA_VERSION],
    )?;
    Ok(())
}

// `parent_id IS NULL` marks rows owned by the implicit root. Images and videos
// reference their case, so deleting a case removes them through the cascade.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS scopes (
    scope_id BLOB PRIMARY KEY CHECK (length(scope_id) = 16),
    slug TEXT NOT NULL UNIQUE CHECK (length(slug) > 0),
    title TEXT NOT NULL,
    created_at BLOB NOT NULL CHECK (length(created_at) = 12)
);

CREATE TABLE IF NOT EXISTS sections (
    section_id BLOB PRIMARY KEY CHECK (length(section_id) = 16),
    scope_id BLOB NOT NULL REFERENCES scopes (scope_id),
    section_key TEXT NOT NULL CHECK (length(section_key) > 0),
    payload TEXT NOT NULL CHECK (json_type(payload) = 'object'),
    order_index INTEGER NOT NULL DEFAULT 0,
    created_at BLOB NOT NULL CHECK (length(created_at) = 12),
    updated_at BLOB NOT NULL CHECK (length(updated_at) = 12),
    UNIQUE (scope_id, section_key)
);
CREATE INDEX IF NOT EXISTS idx_sections_order ON sections (scope_id, order_index, created_at);

CREATE TABLE IF NOT EXISTS entities (
    entity_id BLOB PRIMARY KEY CHECK (length(entity_id) = 16),
    collection TEXT NOT NULL CHECK (collection IN ('case', 'image', 'video', 'team')),
    parent_id BLOB REFERENCES entities (entity_id) ON DELETE CASCADE,
    payload TEXT NOT NULL CHECK (json_type(payload) = 'object'),
    position INTEGER NOT NULL CHECK (position >= 0),
    created_at BLOB NOT NULL CHECK (length(created_at) = 12),
    updated_at BLOB NOT NULL CHECK (length(updated_at) = 12)
);
CREATE INDEX IF NOT EXISTS idx_entities_siblings ON entities (collection, parent_id, position, created_at);
CREATE INDEX IF NOT EXISTS idx_entities_parent ON entities (parent_id);
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_schema_version_once() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn, DEFAULT_BUSY_TIMEOUT).unwrap();
        init_schema(&conn, DEFAULT_BUSY_TIMEOUT).unwrap();

        let (version, rows): (i32, i64) = conn
            .query_row("SELECT MAX(version), COUNT(*) FROM schema_version", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
        assert_eq!(rows, 1);
    }
}
