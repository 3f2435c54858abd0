//! Request-level failures of the summarize operation
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SummaryError {
    /// No summary metadata for the collection.
    #[error("Collection not found")]
    NotFound,
    /// The generation backend failed or returned nothing usable.
    #[error("{0}")]
    GenerationFailure(String),
    /// Any store I/O failure. Fatal to the request.
    #[error("store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl SummaryError {
    /// Outcome label used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::GenerationFailure(_) => "generation_failed",
            Self::Store(_) => "store_error",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::GenerationFailure(_) => 502,
            Self::Store(_) => 500,
        }
    }

    /// Message safe to return to callers. Store details stay in the logs.
    pub fn detail(&self) -> String {
        match self {
            Self::Store(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(feature = "cli")]
mod http {
    use axum::{
        http::StatusCode,
        response::{IntoResponse, Response},
        Json,
    };
    use serde::Serialize;
    use tracing::error;

    use super::SummaryError;

    #[derive(Debug, Serialize)]
    pub struct ErrorResponse {
        pub detail: String,
    }

    impl IntoResponse for SummaryError {
        fn into_response(self) -> Response {
            if let SummaryError::Store(ref e) = self {
                error!("Store failure while summarizing: {:#}", e);
            }
            let status = StatusCode::from_u16(self.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(ErrorResponse { detail: self.detail() })).into_response()
        }
    }
}

#[cfg(feature = "cli")]
pub use http::ErrorResponse;
