//! Question embedding through the shared agent.

use super::{AgentError, Embedder, SharedAgent};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// [`Embedder`] that calls the embeddings endpoint of the shared agent.
pub struct AgentEmbedder {
    agent: Arc<SharedAgent>,
    model: String,
}

impl AgentEmbedder {
    pub fn new(agent: Arc<SharedAgent>, model: impl Into<String>) -> Self {
        Self {
            agent,
            model: model.into(),
        }
    }

    /// Embed several texts in one request (used by the knowledge-base backfill).
    pub async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, AgentError> {
        let agent = self.agent.get().await?;
        agent.embeddings(&self.model, texts).await
    }
}

#[async_trait]
impl Embedder for AgentEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AgentError> {
        let start = Instant::now();
        let mut vectors = self.embed_batch(vec![text.to_string()]).await?;
        let vector = vectors.pop().ok_or_else(|| {
            AgentError::InvalidResponse("Embedding response is empty".to_string())
        })?;

        tracing::debug!(
            model = %self.model,
            duration_ms = start.elapsed().as_millis() as u64,
            words = text.split_whitespace().count(),
            "Generated embedding"
        );
        Ok(vector)
    }
}
