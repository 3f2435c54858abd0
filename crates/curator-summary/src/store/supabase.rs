//! Supabase store over the PostgREST HTTP interface
//!
//! Every call is a single REST request. The write-back is one PATCH carrying
//! both summary columns, so PostgREST applies it as one UPDATE statement.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use super::schema::{CollectionRow, CommentRow, SummaryUpdate, COLLECTIONS_TABLE, COMMENTS_TABLE};
use super::{format_timestamp, parse_timestamp, CollectionMeta, CollectionStore};

pub struct SupabaseStore {
    base_url: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl SupabaseStore {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build Supabase HTTP client: {}", e))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http_client,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.http_client
            .request(method, self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> anyhow::Result<Vec<T>> {
        let response = self
            .request(Method::GET, table)
            .query(query)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Supabase request to '{}' failed: {}", table, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Supabase '{}' returned {}: {}", table, status, body));
        }

        response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to parse Supabase '{}' rows: {}", table, e))
    }
}

#[async_trait]
impl CollectionStore for SupabaseStore {
    async fn get_collection_meta(&self, collection_id: Uuid) -> anyhow::Result<CollectionMeta> {
        let rows: Vec<CollectionRow> = self
            .select(
                COLLECTIONS_TABLE,
                &[
                    ("select", "ai_summary_text,last_summary_generated_at".to_string()),
                    ("id", format!("eq.{}", collection_id)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        let Some(row) = rows.into_iter().next() else {
            return Ok(CollectionMeta::missing());
        };

        Ok(CollectionMeta {
            exists: true,
            summary_text: row.ai_summary_text,
            summary_generated_at: row
                .last_summary_generated_at
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(parse_timestamp)
                .transpose()?,
        })
    }

    async fn get_latest_comment_timestamp(
        &self,
        collection_id: Uuid,
    ) -> anyhow::Result<Option<DateTime<Utc>>> {
        let rows: Vec<CommentRow> = self
            .select(
                COMMENTS_TABLE,
                &[
                    ("select", "created_at".to_string()),
                    ("collection_id", format!("eq.{}", collection_id)),
                    ("order", "created_at.desc".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        rows.into_iter()
            .next()
            .and_then(|row| row.created_at)
            .filter(|v| !v.is_empty())
            .as_deref()
            .map(parse_timestamp)
            .transpose()
    }

    async fn get_latest_comments(
        &self,
        collection_id: Uuid,
        limit: usize,
    ) -> anyhow::Result<Vec<String>> {
        let rows: Vec<CommentRow> = self
            .select(
                COMMENTS_TABLE,
                &[
                    ("select", "comment_text,created_at".to_string()),
                    ("collection_id", format!("eq.{}", collection_id)),
                    ("order", "created_at.desc".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        debug!("Fetched {} comment rows for collection {}", rows.len(), collection_id);
        Ok(rows
            .into_iter()
            .filter_map(|row| row.comment_text)
            .filter(|text| !text.is_empty())
            .collect())
    }

    async fn update_collection_summary(
        &self,
        collection_id: Uuid,
        summary_text: &str,
        generated_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let body = SummaryUpdate {
            ai_summary_text: summary_text,
            last_summary_generated_at: format_timestamp(generated_at),
        };

        let response = self
            .request(Method::PATCH, COLLECTIONS_TABLE)
            .query(&[("id", format!("eq.{}", collection_id))])
            .header("Prefer", "return=minimal")
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Supabase summary update failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Supabase summary update returned {}: {}", status, body));
        }

        debug!("Persisted summary for collection {}", collection_id);
        Ok(())
    }
}
