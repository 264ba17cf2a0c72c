//! OpenAI agent implementation.

use super::types::{EmbeddingRequest, EmbeddingResponse};
use super::{AgentError, ChatCompletionRequest, ChatCompletionResponse, InferenceAgent};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;

/// OpenAI (or OpenAI-compatible) cloud API client:
/// - Chat completion via POST /v1/chat/completions with Bearer token
/// - Embeddings via POST /v1/embeddings
pub struct OpenAIAgent {
    name: String,
    /// Base URL (e.g., "https://api.openai.com")
    base_url: String,
    api_key: String,
    /// Per-request deadline
    timeout: Duration,
    /// Shared HTTP client for connection pooling
    client: Arc<Client>,
}

impl OpenAIAgent {
    pub fn new(
        name: String,
        base_url: String,
        api_key: String,
        timeout: Duration,
        client: Arc<Client>,
    ) -> Self {
        Self {
            name,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
            client,
        }
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    async fn post_json<B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Response, AgentError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .header("authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::Timeout(self.timeout_ms())
                } else {
                    AgentError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AgentError::RateLimited(error_body));
        }
        Err(AgentError::Upstream {
            status: status.as_u16(),
            message: error_body,
        })
    }
}

#[async_trait]
impl InferenceAgent for OpenAIAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, AgentError> {
        let response = self.post_json("/v1/chat/completions", &request).await?;

        response.json().await.map_err(|e| {
            if e.is_timeout() {
                AgentError::Timeout(self.timeout_ms())
            } else {
                AgentError::InvalidResponse(format!("Failed to parse completion response: {}", e))
            }
        })
    }

    async fn embeddings(
        &self,
        model: &str,
        input: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, AgentError> {
        let body = EmbeddingRequest {
            model,
            input: &input,
        };
        let response = self.post_json("/v1/embeddings", &body).await?;

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            AgentError::InvalidResponse(format!("Failed to parse embedding response: {}", e))
        })?;
        if parsed.data.len() != input.len() {
            return Err(AgentError::InvalidResponse(format!(
                "Expected {} embeddings, got {}",
                input.len(),
                parsed.data.len()
            )));
        }

        let mut indexed: Vec<(usize, Vec<f32>)> = parsed
            .data
            .into_iter()
            .enumerate()
            .map(|(position, item)| (item.index.unwrap_or(position), item.embedding))
            .collect();
        indexed.sort_by_key(|(index, _)| *index);

        Ok(indexed.into_iter().map(|(_, vector)| vector).collect())
    }
}
