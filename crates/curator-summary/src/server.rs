//! HTTP server startup and routing
//!
//! One summarize route plus health and metrics probes. All handlers share
//! [`AppState`]; the only network calls leave through the store and the
//! generation backend.

use std::time::Duration;
use tracing::info;

use crate::{config::Config, shared_state::AppState};

/// Build state from `cfg`, bind, and serve until the process stops.
pub async fn run_server(cfg: Config) -> anyhow::Result<()> {
    crate::metrics::init_metrics()?;
    cfg.print_config();

    let state = AppState::from_config(cfg.clone())?;

    let address = cfg.bind_address();
    info!("Starting HTTP server on {}", address);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    let app = build_router(state, Duration::from_secs(cfg.server_timeout_seconds));

    axum::serve(listener, app).await?;

    Ok(())
}

pub fn build_router(state: AppState, request_timeout: Duration) -> axum::Router {
    use axum::{
        routing::{get, post},
        Router,
    };
    use tower_http::{
        cors::{Any, CorsLayer},
        timeout::TimeoutLayer,
        trace::TraceLayer,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers(Any);

    Router::new()
        .route(
            "/api/v1/summarize/:collection_id",
            post(crate::api::summarize_api::summarize),
        )
        .route("/metrics", get(crate::api::get_metrics))
        .route("/healthz", get(|| async { "OK" }))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::generation::{GenerationError, SummaryGenerator};
    use crate::store::{CollectionStore, InMemoryStore};
    use crate::summarizer::{NotFoundPolicy, SummaryOrchestrator};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    struct FixedGenerator(Result<String, GenerationError>);

    #[async_trait]
    impl SummaryGenerator for FixedGenerator {
        async fn generate(&self, _text: &str, _instruction: &str) -> Result<String, GenerationError> {
            self.0.clone()
        }
    }

    fn test_config() -> Config {
        Config {
            store: StoreConfig::Sqlite {
                path: "unused.db".to_string(),
            },
            not_found_policy: NotFoundPolicy::SummaryFieldsAbsent,
            gemini_api_key: "key".to_string(),
            gemini_model: "gemini-2.5-flash".to_string(),
            gemini_base_url: "http://127.0.0.1:9".to_string(),
            api_host: "127.0.0.1".to_string(),
            api_port: 8000,
            http_timeout_seconds: 5,
            server_timeout_seconds: 30,
        }
    }

    fn router_with(
        store: &InMemoryStore,
        reply: Result<String, GenerationError>,
        policy: NotFoundPolicy,
    ) -> axum::Router {
        let orchestrator =
            SummaryOrchestrator::new(Arc::new(store.clone()), Arc::new(FixedGenerator(reply)))
                .with_not_found_policy(policy);
        build_router(
            AppState::new(test_config(), orchestrator),
            Duration::from_secs(30),
        )
    }

    async fn post_summarize(router: axum::Router, id: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/v1/summarize/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn seed_stale(store: &InMemoryStore, id: Uuid) {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        store.insert_summarized_collection(id, "Narasi lama.", at);
        for (i, text) in ["c", "b", "a"].iter().enumerate() {
            store.add_comment(id, text, at + ChronoDuration::minutes(10 - i as i64));
        }
    }

    #[tokio::test]
    async fn test_end_to_end_first_summary() {
        let store = InMemoryStore::new();
        let id = Uuid::new_v4();
        store.insert_collection(id);
        let newest = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        for (i, text) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            store.add_comment(id, text, newest - ChronoDuration::minutes(i as i64));
        }

        let router = router_with(
            &store,
            Ok("Narasi gabungan.".to_string()),
            NotFoundPolicy::RecordAbsent,
        );
        let (status, body) = post_summarize(router, &id.to_string()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"summary": "Narasi gabungan."}));
        let meta = store.get_collection_meta(id).await.unwrap();
        assert_eq!(meta.summary_text.as_deref(), Some("Narasi gabungan."));
    }

    #[tokio::test]
    async fn test_cached_summary_returned() {
        let store = InMemoryStore::new();
        let id = Uuid::new_v4();
        store.insert_summarized_collection(id, "Narasi lama.", Utc::now());

        let router = router_with(
            &store,
            Err(GenerationError::Backend("should not be called".into())),
            NotFoundPolicy::SummaryFieldsAbsent,
        );
        let (status, body) = post_summarize(router, &id.to_string()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"], "Narasi lama.");
    }

    #[tokio::test]
    async fn test_not_found_is_404() {
        let store = InMemoryStore::new();
        let router = router_with(&store, Ok("x".into()), NotFoundPolicy::SummaryFieldsAbsent);

        let (status, body) = post_summarize(router, &Uuid::new_v4().to_string()).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, serde_json::json!({"detail": "Collection not found"}));
    }

    #[tokio::test]
    async fn test_generation_failure_is_502_with_message() {
        let store = InMemoryStore::new();
        let id = Uuid::new_v4();
        seed_stale(&store, id);
        let router = router_with(
            &store,
            Err(GenerationError::Backend("Gemini API error 503: overloaded".into())),
            NotFoundPolicy::SummaryFieldsAbsent,
        );

        let (status, body) = post_summarize(router, &id.to_string()).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["detail"], "Gemini API error 503: overloaded");
    }

    #[tokio::test]
    async fn test_empty_generation_is_502() {
        let store = InMemoryStore::new();
        let id = Uuid::new_v4();
        seed_stale(&store, id);
        let router = router_with(&store, Ok(String::new()), NotFoundPolicy::SummaryFieldsAbsent);

        let (status, body) = post_summarize(router, &id.to_string()).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["detail"], "Empty AI response");
    }

    #[tokio::test]
    async fn test_insufficient_data_is_200_sentinel() {
        let store = InMemoryStore::new();
        let id = Uuid::new_v4();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        store.insert_summarized_collection(id, "Narasi lama.", at);
        store.add_comment(id, "satu", at + ChronoDuration::minutes(1));

        let router = router_with(&store, Ok("x".into()), NotFoundPolicy::SummaryFieldsAbsent);
        let (status, body) = post_summarize(router, &id.to_string()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"], "Belum cukup data untuk merangkum.");
    }

    #[tokio::test]
    async fn test_store_failure_is_500() {
        let store = InMemoryStore::new();
        let id = Uuid::new_v4();
        seed_stale(&store, id);
        store.set_fail_writes(true);

        let router = router_with(&store, Ok("Narasi.".into()), NotFoundPolicy::SummaryFieldsAbsent);
        let (status, body) = post_summarize(router, &id.to_string()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Internal server error");
    }

    #[tokio::test]
    async fn test_invalid_uuid_rejected() {
        let store = InMemoryStore::new();
        let router = router_with(&store, Ok("x".into()), NotFoundPolicy::SummaryFieldsAbsent);

        let (status, _) = post_summarize(router, "not-a-uuid").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_method_not_allowed() {
        let store = InMemoryStore::new();
        let router = router_with(&store, Ok("x".into()), NotFoundPolicy::SummaryFieldsAbsent);

        let response = router
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/summarize/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_health_and_metrics_routes() {
        crate::metrics::init_metrics().unwrap();
        let store = InMemoryStore::new();
        let router = router_with(&store, Ok("x".into()), NotFoundPolicy::SummaryFieldsAbsent);

        let health = router
            .clone()
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);

        let metrics = router
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(metrics.status(), StatusCode::OK);
    }
}
