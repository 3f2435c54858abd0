// Summarize API: returns the stored narrative for a collection or regenerates it
// when newer visitor comments exist
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{error::SummaryError, metrics, shared_state::AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct SummarizeResponse {
    pub summary: String,
}

/// `POST /api/v1/summarize/:collection_id`
///
/// 200 with the cached, regenerated or "not enough data" summary; 404 when the
/// collection is unknown; 502 when the generation backend fails.
pub async fn summarize(
    State(state): State<AppState>,
    Path(collection_id): Path<Uuid>,
) -> Result<Json<SummarizeResponse>, SummaryError> {
    info!("Summarize requested for collection {}", collection_id);

    match state.orchestrator.summarize(collection_id).await {
        Ok(outcome) => {
            metrics::inc_summarize(outcome.label());
            info!("Collection {} summary outcome: {}", collection_id, outcome.label());
            Ok(Json(SummarizeResponse {
                summary: outcome.into_summary_text(),
            }))
        }
        Err(e) => {
            metrics::inc_summarize(e.label());
            Err(e)
        }
    }
}
