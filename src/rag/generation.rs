//! Chat completion with bounded retries.

use super::prompt::PromptMessages;
use super::retry::{AttemptState, RetryPolicy};
use super::GenerationError;
use crate::agent::{ChatCompletionRequest, ChatCompletionResponse, SharedAgent};
use crate::config::GenerationConfig;
use std::sync::Arc;
use std::time::Instant;

/// Result of a successful generation, counts already normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
    /// Trimmed completion; may be empty
    pub text: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    /// Always `prompt_tokens + completion_tokens`
    pub total_tokens: u32,
    pub model: String,
    pub attempts: u32,
}

pub struct GenerationClient {
    agent: Arc<SharedAgent>,
    policy: RetryPolicy,
    model: String,
    temperature: f32,
    max_completion_tokens: u32,
}

impl GenerationClient {
    pub fn new(agent: Arc<SharedAgent>, config: &GenerationConfig) -> Self {
        Self {
            agent,
            policy: RetryPolicy::from_config(config),
            model: config.model.clone(),
            temperature: config.temperature,
            max_completion_tokens: config.max_completion_tokens,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run the completion, retrying transient failures per the policy.
    ///
    /// `prompt_estimate` stands in for the prompt-token count when the
    /// backend reports none. Dropping the returned future cancels the loop
    /// at its current await point, including a pending backoff sleep.
    pub async fn generate(
        &self,
        prompt: PromptMessages,
        prompt_estimate: u32,
    ) -> Result<GenerationOutcome, GenerationError> {
        let agent = self
            .agent
            .get()
            .await
            .map_err(GenerationError::Unavailable)?;

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: prompt.into_messages(),
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_completion_tokens),
        };

        let start = Instant::now();
        let mut state = AttemptState::Attempting { attempt: 1 };
        loop {
            state = match state {
                AttemptState::Attempting { attempt } => {
                    let result = agent.chat_completion(request.clone()).await;
                    metrics::counter!(
                        "lumi_generation_attempts_total",
                        "result" => if result.is_ok() { "ok" } else { "error" }
                    )
                    .increment(1);
                    self.policy.advance(attempt, result)
                }
                AttemptState::RetryScheduled {
                    next_attempt,
                    delay,
                    error,
                } => {
                    tracing::warn!(
                        attempt = next_attempt - 1,
                        max_attempts = self.policy.max_attempts(),
                        backoff_ms = delay.as_millis() as u64,
                        error = %error,
                        error_kind = error.kind(),
                        "Chat completion attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    AttemptState::Attempting {
                        attempt: next_attempt,
                    }
                }
                AttemptState::Succeeded { value, attempts } => {
                    let outcome = self.extract(value, prompt_estimate, attempts);
                    tracing::debug!(
                        model = %outcome.model,
                        attempts,
                        prompt_tokens = outcome.prompt_tokens,
                        completion_tokens = outcome.completion_tokens,
                        latency_ms = start.elapsed().as_millis() as u64,
                        "Chat completion succeeded"
                    );
                    return Ok(outcome);
                }
                AttemptState::FatalFailed { attempts, error } => {
                    return Err(GenerationError::Failed {
                        attempts,
                        source: error,
                    });
                }
            };
        }
    }

    fn extract(
        &self,
        response: ChatCompletionResponse,
        prompt_estimate: u32,
        attempts: u32,
    ) -> GenerationOutcome {
        let text = response.first_content().unwrap_or_default().trim().to_string();
        let usage = response.usage.unwrap_or_default();

        let prompt_tokens = usage
            .prompt_tokens
            .filter(|count| *count > 0)
            .unwrap_or(prompt_estimate);
        let completion_tokens = usage
            .completion_tokens
            .unwrap_or_else(|| u32::try_from(text.split_whitespace().count()).unwrap_or(u32::MAX));
        let model = response
            .model
            .filter(|model| !model.is_empty())
            .unwrap_or_else(|| self.model.clone());

        GenerationOutcome {
            text,
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
            model,
            attempts,
        }
    }
}
