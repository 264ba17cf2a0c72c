//! Retrieval and context-packing configuration

use serde::{Deserialize, Serialize};

/// Largest accepted `top_k`.
pub const MAX_TOP_K: usize = 100;

/// How many knowledge-base entries are surfaced and how relevant they must be.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    /// Minimum similarity score (0.0-1.0) an entry needs to be kept
    pub similarity_threshold: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 6,
            similarity_threshold: 0.0,
        }
    }
}

/// Token budget for the packed FAQ context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Total tokens the packed context may use
    pub token_budget: u32,
    /// Per-entry cap; the question gets half of it, the answer all of it
    pub max_chunk_tokens: u32,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            token_budget: 1200,
            max_chunk_tokens: 400,
        }
    }
}
