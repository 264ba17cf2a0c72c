//! Retrieval-augmented answer pipeline.
//!
//! A question flows through the stages below, leaves first:
//!
//! - [`scorer`]: embed the question, search the knowledge base, turn distances
//!   into scores, filter and rank
//! - [`packer`]: fit ranked candidates into a token budget
//! - [`prompt`]: build the ordered system/user messages
//! - [`generation`] + [`retry`]: call the backend with bounded retries
//! - [`usage`] + [`trace`]: accounting and the diagnostic side-cache
//! - [`pipeline`]: the degradation order tying everything together
//!
//! # Example
//!
//! ```rust
//! use lumi::rag::{fallback_text, insufficient_context_text};
//!
//! assert_ne!(fallback_text(Some("fr")), fallback_text(Some("en")));
//! assert_eq!(insufficient_context_text(Some("de")), insufficient_context_text(None));
//! ```

pub mod error;
pub mod fallback;
pub mod generation;
pub mod packer;
pub mod pipeline;
pub mod prompt;
pub mod retry;
pub mod scorer;
pub mod trace;
pub mod usage;

pub use error::{GenerationError, RagError, RetrievalError};
pub use fallback::{fallback_text, insufficient_context_text};
pub use generation::{GenerationClient, GenerationOutcome};
pub use packer::{ContextPacker, PackedContext, NO_CONTEXT_TEXT};
pub use pipeline::{Collaborators, RagPipeline};
pub use prompt::{PromptAssembler, PromptMessages};
pub use retry::{AttemptState, RetryPolicy};
pub use scorer::{score_from_distance, RetrievalScorer};
pub use trace::TraceRecorder;
pub use usage::{UsageAccountant, UsageRecord};

use serde::{Deserialize, Serialize};

/// Longest snippet reported back to callers, in characters.
pub const SNIPPET_MAX_CHARS: usize = 280;

/// A scored knowledge-base entry. `score` is in `[0, 1]`, 1 being most relevant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub score: f64,
}

impl Candidate {
    pub fn rounded_score(&self) -> f64 {
        round4(self.score)
    }

    pub fn to_used(&self) -> UsedCandidate {
        UsedCandidate {
            id: self.id,
            score: self.rounded_score(),
            q: safe_snippet(&self.question, SNIPPET_MAX_CHARS),
            a: safe_snippet(&self.answer, SNIPPET_MAX_CHARS),
        }
    }
}

/// Caller-facing view of a candidate that made it into the prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsedCandidate {
    pub id: i64,
    pub score: f64,
    pub q: String,
    pub a: String,
}

/// Answer returned for every handled question, degraded or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagResponse {
    pub text: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    /// Empty unless generation succeeded
    pub model: String,
    pub used_candidates: Vec<UsedCandidate>,
}

impl RagResponse {
    /// Static answer with zero usage.
    pub fn canned(text: &str, used_candidates: Vec<UsedCandidate>) -> Self {
        Self {
            text: text.to_string(),
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            model: String::new(),
            used_candidates,
        }
    }
}

pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Trim `text` and cut it to `max_chars` characters, the last one replaced by `…`.
pub fn safe_snippet(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_snippet() {
        assert_eq!(safe_snippet("  short  ", 280), "short");
        let long = "é".repeat(300);
        let cut = safe_snippet(&long, 280);
        assert_eq!(cut.chars().count(), 280);
        assert!(cut.ends_with('…'));
    }

    #[test]
    fn test_used_view_rounds_score() {
        let candidate = Candidate {
            id: 7,
            question: " Opening hours? ".to_string(),
            answer: "9 to 6".to_string(),
            score: 0.876_549,
        };
        let used = candidate.to_used();
        assert_eq!(used.id, 7);
        assert_eq!(used.score, 0.8765);
        assert_eq!(used.q, "Opening hours?");
    }
}
