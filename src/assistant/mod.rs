//! Language-model backed helpers: due-date extraction, answering questions
//! about the task list, and reminder-time suggestions.

mod extract;
mod query;
mod suggest;

pub use extract::{ExtractDateTimeInput, ExtractDateTimeOutput};

use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::llm::{LlmClient, LlmError, LlmRequest};

pub struct Assistant {
    client: Arc<dyn LlmClient>,
    model: String,
    temperature: f32,
}

impl Assistant {
    pub fn new(client: Arc<dyn LlmClient>, config: &LlmConfig) -> Self {
        Self {
            client,
            model: config.model.clone(),
            temperature: config.temperature,
        }
    }

    async fn ask(&self, system: &str, user: String, json: bool) -> Result<String, LlmError> {
        tracing::debug!("LLM prompt ({} chars)", user.len());
        let reply = self
            .client
            .complete(LlmRequest {
                system: system.to_string(),
                user,
                model: self.model.clone(),
                temperature: self.temperature,
                json,
            })
            .await?;
        tracing::debug!("LLM reply: {}", reply);
        Ok(reply)
    }
}

/// Parse a JSON object out of a model reply, tolerating code fences and
/// chatter around the object.
pub fn parse_json_reply<T: DeserializeOwned>(reply: &str) -> Result<T, LlmError> {
    let trimmed = strip_code_fence(reply.trim());
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }
    let object = extract_json(trimmed)
        .ok_or_else(|| LlmError::Serialization(format!("no JSON object in reply: {}", reply)))?;
    serde_json::from_str(object).map_err(|e| LlmError::Serialization(e.to_string()))
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") on the opening line
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}
