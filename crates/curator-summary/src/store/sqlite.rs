//! SQLite-backed collection store for local development
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::schema::{self, CollectionRow};
use super::{format_timestamp, parse_timestamp, CollectionMeta, CollectionStore};

pub struct SqliteStore {
    pool: Arc<Pool<SqliteConnectionManager>>,
}

impl SqliteStore {
    /// Open (or create) the database file and bring the schema up to date.
    pub fn open(db_path: &Path) -> anyhow::Result<Self> {
        info!("Opening collection database at: {}", db_path.display());
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(db_path).with_flags(
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        );
        let pool = Pool::builder()
            .max_size(8)
            .build(manager)
            .map_err(|e| anyhow::anyhow!("Failed to create connection pool: {}", e))?;

        {
            let mut conn = pool.get()?;
            conn.execute_batch(
                "PRAGMA foreign_keys = ON;
                 PRAGMA journal_mode = WAL;
                 PRAGMA busy_timeout = 5000;",
            )?;
            schema::initialize_schema(&mut conn)?;
        }

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Run `f` on a pooled connection off the async executor.
    async fn with_conn<T, F>(&self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&rusqlite::Connection) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = Arc::clone(&self.pool);
        tokio::task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| anyhow::anyhow!("Failed to get connection from pool: {}", e))?;
            f(&conn)
        })
        .await
        .map_err(|e| anyhow::anyhow!("SQLite task failed: {}", e))?
    }

    /// Register a collection with no summary yet.
    pub async fn insert_collection(&self, collection_id: Uuid, name: &str) -> anyhow::Result<()> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO collections (id, name) VALUES (?1, ?2)",
                params![collection_id.to_string(), name],
            )?;
            Ok(())
        })
        .await
    }

    /// Add a visitor comment. Used to seed local databases.
    pub async fn insert_comment(
        &self,
        collection_id: Uuid,
        text: &str,
        created_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let text = text.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO comments (collection_id, comment_text, created_at) VALUES (?1, ?2, ?3)",
                params![collection_id.to_string(), text, format_timestamp(created_at)],
            )?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl CollectionStore for SqliteStore {
    async fn get_collection_meta(&self, collection_id: Uuid) -> anyhow::Result<CollectionMeta> {
        let row = self
            .with_conn(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT ai_summary_text, last_summary_generated_at
                         FROM collections WHERE id = ?1",
                        [collection_id.to_string()],
                        |row| {
                            Ok(CollectionRow {
                                ai_summary_text: row.get(0)?,
                                last_summary_generated_at: row.get(1)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(row)
            })
            .await?;

        match row {
            Some(row) => Ok(CollectionMeta {
                exists: true,
                summary_text: row.ai_summary_text,
                summary_generated_at: row
                    .last_summary_generated_at
                    .as_deref()
                    .map(parse_timestamp)
                    .transpose()?,
            }),
            None => Ok(CollectionMeta::missing()),
        }
    }

    async fn get_latest_comment_timestamp(
        &self,
        collection_id: Uuid,
    ) -> anyhow::Result<Option<DateTime<Utc>>> {
        let raw: Option<String> = self
            .with_conn(move |conn| {
                let ts = conn
                    .query_row(
                        "SELECT created_at FROM comments
                         WHERE collection_id = ?1
                         ORDER BY created_at DESC LIMIT 1",
                        [collection_id.to_string()],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(ts)
            })
            .await?;

        raw.as_deref().map(parse_timestamp).transpose()
    }

    async fn get_latest_comments(
        &self,
        collection_id: Uuid,
        limit: usize,
    ) -> anyhow::Result<Vec<String>> {
        let texts = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT comment_text FROM comments
                     WHERE collection_id = ?1
                     ORDER BY created_at DESC LIMIT ?2",
                )?;
                let texts = stmt
                    .query_map(params![collection_id.to_string(), limit as i64], |row| {
                        row.get::<_, String>(0)
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(texts)
            })
            .await?;

        debug!("Fetched {} comments for collection {}", texts.len(), collection_id);
        Ok(texts.into_iter().filter(|t| !t.is_empty()).collect())
    }

    async fn update_collection_summary(
        &self,
        collection_id: Uuid,
        summary_text: &str,
        generated_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let summary_text = summary_text.to_string();
        let updated = self
            .with_conn(move |conn| {
                let updated = conn.execute(
                    "UPDATE collections SET
                     ai_summary_text = ?2,
                     last_summary_generated_at = ?3
                     WHERE id = ?1",
                    params![
                        collection_id.to_string(),
                        summary_text,
                        format_timestamp(generated_at),
                    ],
                )?;
                Ok(updated)
            })
            .await?;

        debug!("Summary write-back for {} touched {} row(s)", collection_id, updated);
        Ok(())
    }
}
