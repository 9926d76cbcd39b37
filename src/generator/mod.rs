//! AI 生成模块：根据旅行偏好调用外部模型生成目的地建议。
//!
//! # Suggestion Generation
//!
//! The first step of the fallback chain. A [`SuggestionGenerator`] turns
//! normalized trip preferences into suggestion records; any error it returns
//! sends the request on to seeded data.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`SuggestionGenerator`] | Trait for AI backends (and test doubles) |
//! | [`OpenAiGenerator`] | OpenAI-compatible chat-completions backend |
//! | [`build_prompt`] | Prompt text derived from trip preferences |

mod openai;
mod prompt;

pub use openai::{OpenAiGenerator, OpenAiSettings};
pub use prompt::{build_prompt, SYSTEM_PROMPT};

use crate::cache::NormalizedSuggestionParams;
use crate::suggestions::SuggestionRecord;
use crate::transport::TransportError;
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("AI request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("AI circuit breaker is open")]
    CircuitOpen,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("malformed AI response: {0}")]
    Malformed(String),

    #[error("AI response does not match the suggestion schema: {0}")]
    Schema(String),

    #[error("AI returned an empty suggestion list")]
    Empty,

    #[error("AI generator panicked: {0}")]
    Panicked(String),
}

#[async_trait]
pub trait SuggestionGenerator: Send + Sync {
    async fn generate(
        &self,
        params: &NormalizedSuggestionParams,
        request_id: &str,
    ) -> Result<Vec<SuggestionRecord>, GenerationError>;

    fn name(&self) -> &'static str;
}
