//! Collection store - comment reads and summary write-back
//!
//! The orchestrator only talks to [`CollectionStore`]. Three backends exist:
//! Supabase over PostgREST for production, SQLite for local development and
//! an in-process map for tests.

pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod supabase;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use supabase::SupabaseStore;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::config::{Config, StoreConfig};

/// Summary fields of a collection record.
///
/// `exists` tells whether the record itself was found; the summary fields are
/// `None` both for a missing record and for one that was never summarized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMeta {
    pub exists: bool,
    pub summary_text: Option<String>,
    pub summary_generated_at: Option<DateTime<Utc>>,
}

impl CollectionMeta {
    pub fn missing() -> Self {
        Self::default()
    }

    /// True when neither summary field is set.
    pub fn has_no_summary_fields(&self) -> bool {
        self.summary_text.is_none() && self.summary_generated_at.is_none()
    }

    /// The stored summary, if both fields are set and the text is non-empty.
    pub fn cached_summary(&self) -> Option<(&str, DateTime<Utc>)> {
        match (self.summary_text.as_deref(), self.summary_generated_at) {
            (Some(text), Some(generated_at)) if !text.is_empty() => Some((text, generated_at)),
            _ => None,
        }
    }
}

#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Summary fields for a collection. A missing record is not an error.
    async fn get_collection_meta(&self, collection_id: Uuid) -> anyhow::Result<CollectionMeta>;

    /// Creation time of the newest comment, if the collection has any.
    async fn get_latest_comment_timestamp(
        &self,
        collection_id: Uuid,
    ) -> anyhow::Result<Option<DateTime<Utc>>>;

    /// Up to `limit` comment texts, newest first. Empty texts are skipped.
    async fn get_latest_comments(
        &self,
        collection_id: Uuid,
        limit: usize,
    ) -> anyhow::Result<Vec<String>>;

    /// Overwrite both summary fields in a single update.
    async fn update_collection_summary(
        &self,
        collection_id: Uuid,
        summary_text: &str,
        generated_at: DateTime<Utc>,
    ) -> anyhow::Result<()>;
}

/// Build the store selected by configuration.
pub fn open_store(config: &Config) -> anyhow::Result<Arc<dyn CollectionStore>> {
    match &config.store {
        StoreConfig::Supabase { url, key } => {
            let store = SupabaseStore::new(
                url,
                key,
                Duration::from_secs(config.http_timeout_seconds),
            )?;
            info!("Using Supabase store at {}", url);
            Ok(Arc::new(store))
        }
        StoreConfig::Sqlite { path } => {
            let store = SqliteStore::open(std::path::Path::new(path))?;
            info!("Using SQLite store at {}", path);
            Ok(Arc::new(store))
        }
    }
}

/// Parse a store timestamp. RFC 3339 with `Z` or an offset is the normal
/// form; timestamps without a zone are taken as UTC.
pub fn parse_timestamp(value: &str) -> anyhow::Result<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }

    // Postgres text output uses short offsets like "+00"
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%#z", "%Y-%m-%d %H:%M:%S%.f%#z"] {
        if let Ok(ts) = DateTime::parse_from_str(value, fmt) {
            return Ok(ts.with_timezone(&Utc));
        }
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(naive.and_utc());
        }
    }

    Err(anyhow::anyhow!("Unrecognized timestamp: '{}'", value))
}

/// Fixed-width RFC 3339 form, so stored timestamps also sort as text.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_rfc3339_zulu() {
        let ts = parse_timestamp("2024-05-01T10:00:00Z").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let ts = parse_timestamp("2024-05-01T17:00:00+07:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_postgres_fractional_offset() {
        let ts = parse_timestamp("2024-05-01T10:00:00.123456+00:00").unwrap();
        assert_eq!(ts.timestamp_subsec_micros(), 123456);
    }

    #[test]
    fn test_parse_naive_is_utc() {
        let ts = parse_timestamp("2024-05-01T10:00:00.500").unwrap();
        assert_eq!(ts.timestamp(), Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap().timestamp());
        assert_eq!(ts.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_format_sorts_as_text() {
        let early = Utc.with_ymd_and_hms(2024, 5, 1, 9, 59, 59).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert!(format_timestamp(early) < format_timestamp(late));
        assert_eq!(parse_timestamp(&format_timestamp(late)).unwrap(), late);
    }

    #[test]
    fn test_cached_summary_requires_both_fields() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();

        let full = CollectionMeta {
            exists: true,
            summary_text: Some("Narasi".into()),
            summary_generated_at: Some(ts),
        };
        assert_eq!(full.cached_summary(), Some(("Narasi", ts)));

        let text_only = CollectionMeta {
            summary_generated_at: None,
            ..full.clone()
        };
        assert!(text_only.cached_summary().is_none());
        assert!(!text_only.has_no_summary_fields());

        let empty_text = CollectionMeta {
            summary_text: Some(String::new()),
            ..full
        };
        assert!(empty_text.cached_summary().is_none());

        assert!(CollectionMeta::missing().has_no_summary_fields());
    }
}
