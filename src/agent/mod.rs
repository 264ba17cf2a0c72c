//! Backend abstraction layer.
//!
//! `InferenceAgent` hides the HTTP protocol of a text-generation backend;
//! `Embedder` turns a question into the vector the knowledge base searches with.
//! `SharedAgent` owns the process-wide, lazily created agent handle.

use async_trait::async_trait;

pub mod embedding;
pub mod error;
pub mod factory;
pub mod openai;
pub mod tokenizer;
pub mod types;

pub use embedding::AgentEmbedder;
pub use error::AgentError;
pub use factory::{create_agent, SharedAgent};
pub use tokenizer::{Tokenizer, TokenizerRegistry};
pub use types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Choice, ResponseMessage, Role,
    Usage,
};

/// Unified interface for OpenAI-compatible generation backends.
///
/// Object-safe; used as `Arc<dyn InferenceAgent>`.
///
/// # Cancellation Safety
///
/// Dropping a returned future aborts the in-flight HTTP request.
#[async_trait]
pub trait InferenceAgent: Send + Sync + 'static {
    /// Human-readable name for logging (e.g., "openai").
    fn name(&self) -> &str;

    /// Execute one non-streaming chat completion.
    ///
    /// # Returns
    ///
    /// - `Err(AgentError::RateLimited)` on HTTP 429
    /// - `Err(AgentError::Upstream)` on any other non-2xx status
    /// - `Err(AgentError::Network)` / `Err(AgentError::Timeout)` on transport failure
    /// - `Err(AgentError::InvalidResponse)` if the body is not a completion
    async fn chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, AgentError>;

    /// Embed each input text, preserving order.
    ///
    /// Default implementation returns `Unsupported`.
    async fn embeddings(
        &self,
        _model: &str,
        _input: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, AgentError> {
        Err(AgentError::Unsupported("embeddings"))
    }
}

/// Turns text into a query vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AgentError>;
}
