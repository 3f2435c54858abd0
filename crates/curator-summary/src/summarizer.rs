//! Summary orchestration: freshness check, threshold, generation and write-back
//!
//! One call to [`SummaryOrchestrator::summarize`] is a straight sequence of
//! awaited store and backend calls. Concurrent calls for the same collection
//! are not coordinated; two stale requests may both regenerate and the last
//! write-back wins.

use chrono::{DateTime, Utc};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::SummaryError;
use crate::generation::{SummaryGenerator, SUMMARY_SYSTEM_INSTRUCTION};
use crate::metrics;
use crate::store::{CollectionMeta, CollectionStore};

/// Returned instead of a narrative when there are too few comments.
pub const INSUFFICIENT_DATA_SUMMARY: &str = "Belum cukup data untuk merangkum.";
/// Newest comments sent to the backend.
pub const COMMENT_BATCH_LIMIT: usize = 50;
/// Fewer comments than this yields [`INSUFFICIENT_DATA_SUMMARY`].
pub const MIN_COMMENTS_FOR_SUMMARY: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    /// Stored summary is newer than every comment.
    Cached(String),
    /// Not enough comments to summarize.
    InsufficientData,
    /// Freshly generated and persisted.
    Generated(String),
}

impl SummaryOutcome {
    pub fn summary_text(&self) -> &str {
        match self {
            Self::Cached(text) | Self::Generated(text) => text,
            Self::InsufficientData => INSUFFICIENT_DATA_SUMMARY,
        }
    }

    pub fn into_summary_text(self) -> String {
        match self {
            Self::Cached(text) | Self::Generated(text) => text,
            Self::InsufficientData => INSUFFICIENT_DATA_SUMMARY.to_string(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Cached(_) => "cached",
            Self::InsufficientData => "insufficient",
            Self::Generated(_) => "generated",
        }
    }
}

/// What counts as "collection not found".
///
/// `SummaryFieldsAbsent` treats a collection that was never summarized the
/// same as one that does not exist. `RecordAbsent` only rejects collections
/// whose record is missing from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotFoundPolicy {
    #[default]
    SummaryFieldsAbsent,
    RecordAbsent,
}

impl NotFoundPolicy {
    fn is_missing(self, meta: &CollectionMeta) -> bool {
        match self {
            Self::SummaryFieldsAbsent => meta.has_no_summary_fields(),
            Self::RecordAbsent => !meta.exists,
        }
    }
}

impl FromStr for NotFoundPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "summary-fields" | "summary_fields" => Ok(Self::SummaryFieldsAbsent),
            "record" => Ok(Self::RecordAbsent),
            other => Err(anyhow::anyhow!(
                "Unknown not-found policy '{}'. Expected 'summary-fields' or 'record'.",
                other
            )),
        }
    }
}

/// The stored summary, if it is still fresh.
///
/// Fresh means a non-empty summary with a timestamp exists and no comment is
/// at or after that timestamp.
pub fn fresh_summary(
    meta: &CollectionMeta,
    latest_comment_at: Option<DateTime<Utc>>,
) -> Option<&str> {
    let (text, generated_at) = meta.cached_summary()?;
    match latest_comment_at {
        None => Some(text),
        Some(comment_at) if comment_at < generated_at => Some(text),
        Some(_) => None,
    }
}

pub struct SummaryOrchestrator {
    store: Arc<dyn CollectionStore>,
    generator: Arc<dyn SummaryGenerator>,
    not_found_policy: NotFoundPolicy,
}

impl SummaryOrchestrator {
    pub fn new(store: Arc<dyn CollectionStore>, generator: Arc<dyn SummaryGenerator>) -> Self {
        Self {
            store,
            generator,
            not_found_policy: NotFoundPolicy::default(),
        }
    }

    pub fn with_not_found_policy(mut self, policy: NotFoundPolicy) -> Self {
        self.not_found_policy = policy;
        self
    }

    pub fn store(&self) -> &Arc<dyn CollectionStore> {
        &self.store
    }

    pub async fn summarize(&self, collection_id: Uuid) -> Result<SummaryOutcome, SummaryError> {
        let meta = self.store.get_collection_meta(collection_id).await?;
        if self.not_found_policy.is_missing(&meta) {
            info!("Collection {} not found", collection_id);
            return Err(SummaryError::NotFound);
        }

        let latest_comment_at = self.store.get_latest_comment_timestamp(collection_id).await?;
        if let Some(text) = fresh_summary(&meta, latest_comment_at) {
            debug!("Returning cached summary for collection {}", collection_id);
            return Ok(SummaryOutcome::Cached(text.to_string()));
        }

        let comments = self
            .store
            .get_latest_comments(collection_id, COMMENT_BATCH_LIMIT)
            .await?;
        if comments.len() < MIN_COMMENTS_FOR_SUMMARY {
            info!(
                "Collection {} has {} comment(s), not enough to summarize",
                collection_id,
                comments.len()
            );
            return Ok(SummaryOutcome::InsufficientData);
        }

        info!(
            "Regenerating summary for collection {} from {} comments",
            collection_id,
            comments.len()
        );
        let input = comments.join("\n");

        let started = Instant::now();
        let generated = self
            .generator
            .generate(&input, SUMMARY_SYSTEM_INSTRUCTION)
            .await;
        metrics::observe_generation(started.elapsed().as_secs_f64());

        let summary = match generated {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                warn!("Generation backend returned an empty summary for {}", collection_id);
                return Err(SummaryError::GenerationFailure("Empty AI response".to_string()));
            }
            Err(e) => {
                warn!("Summary generation failed for {}: {}", collection_id, e);
                return Err(SummaryError::GenerationFailure(e.to_string()));
            }
        };

        let generated_at = Utc::now();
        self.store
            .update_collection_summary(collection_id, &summary, generated_at)
            .await?;
        info!("Stored new summary for collection {} at {}", collection_id, generated_at);

        Ok(SummaryOutcome::Generated(summary))
    }
}
