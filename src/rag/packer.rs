//! Greedy, token-budgeted context assembly.

use super::Candidate;
use crate::agent::Tokenizer;
use crate::config::ContextConfig;
use std::sync::Arc;

/// Context text used when no candidate fits.
pub const NO_CONTEXT_TEXT: &str = "(no relevant context)";

/// Text handed to the prompt plus the candidates it contains, in rank order.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedContext {
    pub text: String,
    pub used_candidates: Vec<Candidate>,
}

impl PackedContext {
    fn empty() -> Self {
        Self {
            text: NO_CONTEXT_TEXT.to_string(),
            used_candidates: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.used_candidates.is_empty()
    }
}

pub struct ContextPacker {
    tokenizer: Arc<dyn Tokenizer>,
    token_budget: u32,
    max_chunk_tokens: u32,
}

impl ContextPacker {
    pub fn new(tokenizer: Arc<dyn Tokenizer>, config: &ContextConfig) -> Self {
        Self {
            tokenizer,
            token_budget: config.token_budget,
            max_chunk_tokens: config.max_chunk_tokens.max(1),
        }
    }

    /// `"{n}. Q: <question>\n   A: <answer>"` with the question cut to half
    /// the per-entry cap and the answer to the full cap.
    pub fn summarize(&self, index: usize, candidate: &Candidate) -> String {
        let question = self
            .tokenizer
            .truncate(&candidate.question, self.max_chunk_tokens / 2);
        let answer = self
            .tokenizer
            .truncate(&candidate.answer, self.max_chunk_tokens);
        format!("{}. Q: {}\n   A: {}", index, question, answer)
    }

    /// Include candidates in rank order until the next one would overflow
    /// the budget. A lower-ranked entry is never taken in place of a
    /// higher-ranked one; only the very first entry may be trimmed to fit.
    pub fn pack(&self, candidates: &[Candidate]) -> PackedContext {
        let mut text = String::new();
        let mut used = Vec::new();

        for (position, candidate) in candidates.iter().enumerate() {
            let summary = self.summarize(position + 1, candidate);
            let next = if text.is_empty() {
                summary.clone()
            } else {
                format!("{}\n{}", text, summary)
            };

            if self.tokenizer.count_tokens(&next) <= self.token_budget {
                text = next;
                used.push(candidate.clone());
                continue;
            }

            if used.is_empty() && self.token_budget > 0 {
                if let Some(trimmed) = self.trim_to_budget(&summary) {
                    text = trimmed;
                    used.push(candidate.clone());
                }
            }
            break;
        }

        if used.is_empty() {
            return PackedContext::empty();
        }

        tracing::debug!(
            used = used.len(),
            offered = candidates.len(),
            budget = self.token_budget,
            "Packed FAQ context"
        );
        PackedContext {
            text,
            used_candidates: used,
        }
    }

    /// Cut `summary` to the budget, shrinking further when a decode
    /// round-trip re-counts above it.
    fn trim_to_budget(&self, summary: &str) -> Option<String> {
        let mut limit = self.token_budget;
        loop {
            let trimmed = self.tokenizer.truncate(summary, limit);
            let count = self.tokenizer.count_tokens(&trimmed);
            if count <= self.token_budget {
                return (!trimmed.trim().is_empty()).then_some(trimmed);
            }
            if limit == 0 {
                return None;
            }
            let overflow = count - self.token_budget;
            limit = limit.saturating_sub(overflow.max(1));
        }
    }
}
