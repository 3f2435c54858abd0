//! Text generation backends that turn visitor comments into a narrative

pub mod gemini;

pub use gemini::GeminiGenerator;

use async_trait::async_trait;
use thiserror::Error;

/// Persona and constraints sent with every summary request.
pub const SUMMARY_SYSTEM_INSTRUCTION: &str = "You are an empathetic museum assistant. Summarize the following visitor comments into a cohesive, emotional, and inclusive narrative in Indonesian. Avoid bullet points, make it flow like a story. Keep it under 150 words.";

/// Why a generation attempt produced no usable narrative.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("No comments provided")]
    NoInput,
    #[error("Empty AI response")]
    EmptyResponse,
    #[error("{0}")]
    Backend(String),
}

#[async_trait]
pub trait SummaryGenerator: Send + Sync {
    /// Generate text for `text` under `system_instruction`. Returns the
    /// trimmed output; blank output is reported as [`GenerationError::EmptyResponse`].
    async fn generate(
        &self,
        text: &str,
        system_instruction: &str,
    ) -> Result<String, GenerationError>;
}
