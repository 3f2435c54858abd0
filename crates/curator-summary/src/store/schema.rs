//! Table layout shared by the SQLite store and the Supabase row types
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const COLLECTIONS_TABLE: &str = "collections";
pub const COMMENTS_TABLE: &str = "comments";

pub const SCHEMA_VERSION: i32 = 1;

/// Row of `collections` as selected for the freshness check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionRow {
    #[serde(default)]
    pub ai_summary_text: Option<String>,
    #[serde(default)]
    pub last_summary_generated_at: Option<String>,
}

/// Row of `comments`. Either column may be left out of a select.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentRow {
    #[serde(default)]
    pub comment_text: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Body of the write-back update. Both fields always travel together.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryUpdate<'a> {
    pub ai_summary_text: &'a str,
    pub last_summary_generated_at: String,
}

pub const SCHEMA_SQL: &str = "
-- Collections table
CREATE TABLE IF NOT EXISTS collections (
    id TEXT PRIMARY KEY,
    name TEXT,
    ai_summary_text TEXT,
    last_summary_generated_at TEXT
);
-- Comments table
CREATE TABLE IF NOT EXISTS comments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    collection_id TEXT NOT NULL,
    comment_text TEXT NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY (collection_id) REFERENCES collections(id) ON DELETE CASCADE
);
-- Newest-first lookups per collection
CREATE INDEX IF NOT EXISTS idx_comments_collection_created ON comments (collection_id, created_at DESC);
";

/// Create tables if needed and record the schema version.
pub fn initialize_schema(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    let current_version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    if current_version < SCHEMA_VERSION {
        info!("Applying collection schema version {}", SCHEMA_VERSION);
        let tx = conn.transaction()?;
        tx.execute_batch(SCHEMA_SQL)?;
        tx.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [SCHEMA_VERSION],
        )?;
        tx.commit()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_schema_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        initialize_schema(&mut conn).unwrap();
        initialize_schema(&mut conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[test]
    fn test_collection_row_tolerates_missing_columns() {
        let row: CollectionRow = serde_json::from_str("{}").unwrap();
        assert!(row.ai_summary_text.is_none());
        assert!(row.last_summary_generated_at.is_none());
    }

    #[test]
    fn test_summary_update_serializes_both_fields() {
        let body = serde_json::to_value(SummaryUpdate {
            ai_summary_text: "Narasi",
            last_summary_generated_at: "2024-05-01T10:00:00.000000Z".to_string(),
        })
        .unwrap();

        assert_eq!(body["ai_summary_text"], "Narasi");
        assert_eq!(body["last_summary_generated_at"], "2024-05-01T10:00:00.000000Z");
    }
}
