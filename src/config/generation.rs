//! Text-generation backend configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for the chat-completion and embedding backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Administrative kill switch. When false every request gets the fallback text.
    pub enabled: bool,
    /// OpenAI-compatible base URL (without the `/v1` suffix)
    pub base_url: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    /// Chat model used for answers
    pub model: String,
    /// Model used to embed user questions and FAQ entries
    pub embedding_model: String,
    pub temperature: f32,
    pub max_completion_tokens: u32,
    pub request_timeout_secs: u64,
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before each retry, in milliseconds. The last entry repeats.
    pub backoff_ms: Vec<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.openai.com".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            temperature: 0.2,
            max_completion_tokens: 300,
            request_timeout_secs: 30,
            max_attempts: 4,
            backoff_ms: vec![500, 1500, 3000],
        }
    }
}

impl GenerationConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn backoff_schedule(&self) -> Vec<Duration> {
        self.backoff_ms
            .iter()
            .map(|ms| Duration::from_millis(*ms))
            .collect()
    }
}

/// Parse the loose boolean spellings accepted by `LUMI_AI_ENABLE`.
pub fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
