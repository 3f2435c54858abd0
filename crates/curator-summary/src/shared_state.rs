//! Application state shared by all request handlers
//!
//! Clients are built once at startup and handed to the orchestrator; handlers
//! reach them through `Arc`s, never through globals.

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::{
    config::Config,
    generation::{GeminiGenerator, SummaryGenerator},
    store::{self, CollectionStore},
    summarizer::SummaryOrchestrator,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub orchestrator: Arc<SummaryOrchestrator>,
}

impl AppState {
    pub fn new(config: Config, orchestrator: SummaryOrchestrator) -> Self {
        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// Build the configured store and generation clients.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        info!("Initializing application state");

        let store: Arc<dyn CollectionStore> = store::open_store(&config)?;
        let generator: Arc<dyn SummaryGenerator> = Arc::new(GeminiGenerator::new(
            &config.gemini_base_url,
            &config.gemini_model,
            &config.gemini_api_key,
            Duration::from_secs(config.http_timeout_seconds),
        )?);

        let orchestrator =
            SummaryOrchestrator::new(store, generator).with_not_found_policy(config.not_found_policy);
        Ok(Self::new(config, orchestrator))
    }
}
