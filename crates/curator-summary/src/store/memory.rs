use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use super::{CollectionMeta, CollectionStore};

#[derive(Debug, Clone)]
struct StoredComment {
    text: String,
    created_at: DateTime<Utc>,
}

/// Process-local store. Cloning shares the underlying maps.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    collections: Arc<DashMap<Uuid, CollectionMeta>>,
    comments: Arc<DashMap<Uuid, Vec<StoredComment>>>,
    summary_writes: Arc<AtomicUsize>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collection with no summary yet.
    pub fn insert_collection(&self, collection_id: Uuid) {
        self.collections.insert(
            collection_id,
            CollectionMeta {
                exists: true,
                ..CollectionMeta::default()
            },
        );
    }

    /// Register a collection that already carries a summary.
    pub fn insert_summarized_collection(
        &self,
        collection_id: Uuid,
        summary_text: &str,
        generated_at: DateTime<Utc>,
    ) {
        self.collections.insert(
            collection_id,
            CollectionMeta {
                exists: true,
                summary_text: Some(summary_text.to_string()),
                summary_generated_at: Some(generated_at),
            },
        );
    }

    pub fn add_comment(&self, collection_id: Uuid, text: &str, created_at: DateTime<Utc>) {
        self.comments.entry(collection_id).or_default().push(StoredComment {
            text: text.to_string(),
            created_at,
        });
    }

    /// Number of successful summary write-backs so far.
    pub fn summary_writes(&self) -> usize {
        self.summary_writes.load(Ordering::SeqCst)
    }

    /// Make every later write-back fail, to exercise store errors.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn newest_first(&self, collection_id: Uuid) -> Vec<StoredComment> {
        let mut comments = self
            .comments
            .get(&collection_id)
            .map(|c| c.clone())
            .unwrap_or_default();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        comments
    }
}

#[async_trait]
impl CollectionStore for InMemoryStore {
    async fn get_collection_meta(&self, collection_id: Uuid) -> anyhow::Result<CollectionMeta> {
        Ok(self
            .collections
            .get(&collection_id)
            .map(|meta| meta.clone())
            .unwrap_or_else(CollectionMeta::missing))
    }

    async fn get_latest_comment_timestamp(
        &self,
        collection_id: Uuid,
    ) -> anyhow::Result<Option<DateTime<Utc>>> {
        Ok(self
            .comments
            .get(&collection_id)
            .and_then(|c| c.iter().map(|comment| comment.created_at).max()))
    }

    async fn get_latest_comments(
        &self,
        collection_id: Uuid,
        limit: usize,
    ) -> anyhow::Result<Vec<String>> {
        Ok(self
            .newest_first(collection_id)
            .into_iter()
            .take(limit)
            .map(|c| c.text)
            .filter(|t| !t.is_empty())
            .collect())
    }

    async fn update_collection_summary(
        &self,
        collection_id: Uuid,
        summary_text: &str,
        generated_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("write-back rejected for collection {}", collection_id);
        }

        // Matches an UPDATE filtered by id: unknown collections are left alone.
        if let Some(mut meta) = self.collections.get_mut(&collection_id) {
            *meta = CollectionMeta {
                exists: true,
                summary_text: Some(summary_text.to_string()),
                summary_generated_at: Some(generated_at),
            };
        }
        self.summary_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
