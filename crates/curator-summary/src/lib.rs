// curator-summary/crates/curator-summary/src/lib.rs

pub mod config;
pub mod error;
pub mod generation;
pub mod metrics;
pub mod shared_state;
pub mod store;
pub mod summarizer;
pub mod telemetry;

#[cfg(feature = "cli")]
pub mod api;
#[cfg(feature = "cli")]
pub mod server;

// Public API exports
pub use config::{Config, StoreConfig};
pub use error::SummaryError;
pub use generation::{GeminiGenerator, GenerationError, SummaryGenerator, SUMMARY_SYSTEM_INSTRUCTION};
pub use shared_state::AppState;
pub use store::{CollectionMeta, CollectionStore, InMemoryStore, SqliteStore, SupabaseStore};
pub use summarizer::{
    NotFoundPolicy, SummaryOrchestrator, SummaryOutcome, COMMENT_BATCH_LIMIT,
    INSUFFICIENT_DATA_SUMMARY, MIN_COMMENTS_FOR_SUMMARY,
};

#[cfg(feature = "cli")]
pub use server::{build_router, run_server};
