//! Hosted language model access.

mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// One prompt/response exchange
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub system: String,
    pub user: String,
    pub model: String,
    pub temperature: f32,
    /// Ask the model for a JSON object instead of free text
    pub json: bool,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: LlmRequest) -> Result<String, LlmError>;
}

#[async_trait]
impl LlmClient for Arc<dyn LlmClient> {
    async fn complete(&self, request: LlmRequest) -> Result<String, LlmError> {
        (**self).complete(request).await
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("http error: {0}")]
    Http(String),
    #[error("response error: {0}")]
    Response(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("language model is not configured (set GEMINI_API_KEY or llm.api_key)")]
    NotConfigured,
}
