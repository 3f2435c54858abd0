// curator-summary/src/api/mod.rs
//! API module - HTTP handlers

pub mod summarize_api;

pub use summarize_api::{summarize, SummarizeResponse};

use axum::{http::StatusCode, response::IntoResponse};

pub async fn get_metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        crate::metrics::render(),
    )
}
