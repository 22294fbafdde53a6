//! Model backend trait.
//!
//! Implemented by the `moca-providers` crate. The engine only ever sees this
//! trait, so tests can swap in a scripted backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A structured-output chat model that can look at images.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Human-readable backend name (e.g. "openai").
    fn name(&self) -> &str;

    /// Send one rubric prompt plus the patient's artifact.
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<CompletionResponse>;
}

/// One model call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier (e.g. "gpt-4o-mini").
    pub model: String,
    /// Rubric prompt.
    pub system_prompt: String,
    /// Text part of the user message.
    pub user_text: String,
    /// Image as a `data:` URL, for drawing tasks.
    #[serde(default)]
    pub image_data_url: Option<String>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Ask the backend to constrain output to a JSON object.
    #[serde(default)]
    pub json_output: bool,
}

/// What came back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The raw message content.
    pub content: String,
    /// Model that actually answered.
    pub model: String,
    pub token_usage: TokenUsage,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Pull the JSON object out of a model reply.
///
/// Handles:
/// - A bare JSON object (returned trimmed)
/// - A ```json``` or generic ``` fenced block (first one wins)
/// - A truncated, unclosed fence (accumulated content is used)
pub fn extract_json_object(response: &str) -> String {
    let trimmed = response.trim();
    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    let mut in_block = false;
    let mut current_block = String::new();

    for line in response.lines() {
        let line_trimmed = line.trim();

        if !in_block && line_trimmed.starts_with("```") {
            let lang = line_trimmed.trim_start_matches('`').trim().to_lowercase();
            if lang.is_empty() || lang == "json" {
                in_block = true;
                current_block.clear();
            }
            continue;
        }

        if in_block && line_trimmed == "```" {
            return current_block.trim().to_string();
        }

        if in_block {
            if !current_block.is_empty() {
                current_block.push('\n');
            }
            current_block.push_str(line);
        }
    }

    if in_block && !current_block.is_empty() {
        return current_block.trim().to_string();
    }

    trimmed.to_string()
}
