//! Turns a question into ranked candidates.

use super::{Candidate, RetrievalError};
use crate::agent::Embedder;
use crate::config::RetrievalConfig;
use crate::store::{KnowledgeBase, RawCandidate};
use std::sync::Arc;

/// `clamp(1 - distance, 0, 1)`; non-finite distances score 0.
pub fn score_from_distance(distance: f64) -> f64 {
    if !distance.is_finite() {
        return 0.0;
    }
    (1.0 - distance).clamp(0.0, 1.0)
}

pub struct RetrievalScorer {
    embedder: Arc<dyn Embedder>,
    knowledge_base: Arc<dyn KnowledgeBase>,
    top_k: usize,
    threshold: f64,
}

impl RetrievalScorer {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        knowledge_base: Arc<dyn KnowledgeBase>,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            knowledge_base,
            top_k: config.top_k.max(1),
            threshold: config.similarity_threshold,
        }
    }

    /// Top candidates for `question`, best first.
    ///
    /// A blank question returns an empty list without touching the embedder
    /// or the knowledge base.
    pub async fn retrieve(
        &self,
        tenant_id: &str,
        question: &str,
    ) -> Result<Vec<Candidate>, RetrievalError> {
        let question = question.trim();
        if question.is_empty() {
            return Ok(Vec::new());
        }

        let embedding = self
            .embedder
            .embed(question)
            .await
            .map_err(RetrievalError::Embedding)?;

        // Over-fetch so threshold filtering can still leave top_k rows.
        let rows = self
            .knowledge_base
            .search(tenant_id, &embedding, self.top_k.saturating_mul(2))
            .await
            .map_err(RetrievalError::Search)?;

        let candidates = self.rank(rows);
        tracing::debug!(
            tenant_id,
            candidates = candidates.len(),
            threshold = self.threshold,
            "Retrieved FAQ candidates"
        );
        Ok(candidates)
    }

    /// Score, filter by threshold, stable-sort descending and cut to `top_k`.
    pub fn rank(&self, rows: Vec<RawCandidate>) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = rows
            .into_iter()
            .map(|row| Candidate {
                score: score_from_distance(row.distance),
                id: row.id,
                question: row.question,
                answer: row.answer,
            })
            .filter(|candidate| candidate.score >= self.threshold)
            .collect();

        // sort_by is stable: ties keep the knowledge base's order
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates.truncate(self.top_k);
        candidates
    }
}
