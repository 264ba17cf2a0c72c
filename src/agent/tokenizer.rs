//! Token counting and truncation
//!
//! The context packer and prompt assembler only see the [`Tokenizer`] trait, so
//! the encoding can be swapped without touching them. Three tiers exist:
//! - **Exact**: the model's own tiktoken encoding
//! - **Approximation**: `cl100k_base` standing in for unknown models
//! - **Heuristic**: character-based estimate when no BPE data can be loaded
//!
//! [`WhitespaceTokenizer`] is a cheap word counter used by tests and benches.
//!
//! # Example
//!
//! ```rust
//! use lumi::agent::tokenizer::TokenizerRegistry;
//!
//! let registry = TokenizerRegistry::new().unwrap();
//! let tokenizer = registry.for_model("gpt-4o-mini");
//! assert!(tokenizer.count_tokens("Hello world") > 0);
//! ```

use globset::{Glob, GlobMatcher};
use std::sync::Arc;
use thiserror::Error;
use tiktoken_rs::CoreBPE;

pub const TIER_EXACT: u8 = 0;
pub const TIER_APPROXIMATION: u8 = 1;
pub const TIER_HEURISTIC: u8 = 2;

/// Models using the o200k_base encoding (including fine-tunes).
const O200K_PATTERNS: &[&str] = &[
    "gpt-4o*",
    "chatgpt-4o*",
    "gpt-4.1*",
    "gpt-5*",
    "o1*",
    "o3*",
    "o4*",
    "ft:gpt-4o*",
    "ft:gpt-4.1*",
];

/// Models using the cl100k_base encoding.
const CL100K_PATTERNS: &[&str] = &[
    "gpt-4",
    "gpt-4-*",
    "gpt-3.5*",
    "ft:gpt-4-*",
    "ft:gpt-3.5*",
    "text-embedding-*",
];

#[derive(Debug, Error)]
pub enum TokenizerError {
    #[error("Failed to load encoding: {0}")]
    Encoding(String),

    #[error("Invalid glob pattern: {0}")]
    GlobPattern(#[from] globset::Error),
}

/// Counts and cuts text in model tokens.
///
/// Implementations are shared across concurrent requests.
pub trait Tokenizer: Send + Sync {
    fn count_tokens(&self, text: &str) -> u32;

    /// Return a prefix of `text` holding at most `limit` tokens.
    /// Text already within the limit is returned unchanged.
    fn truncate(&self, text: &str, limit: u32) -> String;

    /// 0 = exact, 1 = approximation, 2 = heuristic
    fn tier(&self) -> u8;

    fn name(&self) -> &str;
}

/// tiktoken-backed tokenizer.
pub struct TiktokenTokenizer {
    encoding: CoreBPE,
    tier: u8,
    name: &'static str,
}

impl TiktokenTokenizer {
    pub fn o200k_base() -> Result<Self, TokenizerError> {
        Ok(Self {
            encoding: tiktoken_rs::o200k_base()
                .map_err(|e| TokenizerError::Encoding(format!("o200k_base: {}", e)))?,
            tier: TIER_EXACT,
            name: "tiktoken_o200k_base",
        })
    }

    pub fn cl100k_base() -> Result<Self, TokenizerError> {
        Ok(Self {
            encoding: tiktoken_rs::cl100k_base()
                .map_err(|e| TokenizerError::Encoding(format!("cl100k_base: {}", e)))?,
            tier: TIER_EXACT,
            name: "tiktoken_cl100k_base",
        })
    }

    /// cl100k_base used for a model whose real encoding is unknown.
    pub fn approximation() -> Result<Self, TokenizerError> {
        let mut tokenizer = Self::cl100k_base()?;
        tokenizer.tier = TIER_APPROXIMATION;
        tokenizer.name = "tiktoken_approximation";
        Ok(tokenizer)
    }
}

impl Tokenizer for TiktokenTokenizer {
    fn count_tokens(&self, text: &str) -> u32 {
        let len = self.encoding.encode_with_special_tokens(text).len();
        u32::try_from(len).unwrap_or(u32::MAX)
    }

    fn truncate(&self, text: &str, limit: u32) -> String {
        let tokens = self.encoding.encode_with_special_tokens(text);
        let limit = limit as usize;
        if tokens.len() <= limit {
            return text.to_string();
        }

        // A cut can land inside a multi-byte character; back off a few tokens
        // until the prefix decodes cleanly.
        let lowest = limit.saturating_sub(4);
        for end in (lowest..=limit).rev() {
            if let Ok(decoded) = self.encoding.decode(tokens[..end].to_vec()) {
                return decoded;
            }
        }
        String::new()
    }

    fn tier(&self) -> u8 {
        self.tier
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Character-based estimate (~4 chars per token, 1.15x safety margin).
pub struct HeuristicTokenizer {
    multiplier: f64,
}

impl HeuristicTokenizer {
    pub fn new() -> Self {
        Self { multiplier: 1.15 }
    }
}

impl Default for HeuristicTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer for HeuristicTokenizer {
    fn count_tokens(&self, text: &str) -> u32 {
        if text.is_empty() {
            return 0;
        }
        let base_estimate = (text.chars().count() / 4).max(1);
        (base_estimate as f64 * self.multiplier) as u32
    }

    fn truncate(&self, text: &str, limit: u32) -> String {
        if self.count_tokens(text) <= limit {
            return text.to_string();
        }
        let max_chars = (limit as f64 * 4.0 / self.multiplier) as usize;
        text.chars().take(max_chars).collect()
    }

    fn tier(&self) -> u8 {
        TIER_HEURISTIC
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

/// One token per whitespace-separated word.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn count_tokens(&self, text: &str) -> u32 {
        u32::try_from(text.split_whitespace().count()).unwrap_or(u32::MAX)
    }

    fn truncate(&self, text: &str, limit: u32) -> String {
        if self.count_tokens(text) <= limit {
            return text.to_string();
        }
        text.split_whitespace()
            .take(limit as usize)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn tier(&self) -> u8 {
        TIER_HEURISTIC
    }

    fn name(&self) -> &str {
        "whitespace"
    }
}

/// Picks a tokenizer for a model name.
pub struct TokenizerRegistry {
    /// Ordered (pattern, tokenizer) pairs; first match wins
    matchers: Vec<(GlobMatcher, Arc<dyn Tokenizer>)>,

    /// Used for models no pattern matches
    fallback: Arc<dyn Tokenizer>,
}

impl TokenizerRegistry {
    /// Registry covering OpenAI model families.
    ///
    /// Each BPE table is loaded once and shared between its patterns. If a
    /// table cannot be loaded the affected models degrade to the heuristic.
    pub fn new() -> Result<Self, TokenizerError> {
        let heuristic: Arc<dyn Tokenizer> = Arc::new(HeuristicTokenizer::new());
        let o200k = load_or(TiktokenTokenizer::o200k_base(), &heuristic);
        let cl100k = load_or(TiktokenTokenizer::cl100k_base(), &heuristic);

        let mut matchers = Vec::new();
        for pattern in O200K_PATTERNS {
            matchers.push((Glob::new(pattern)?.compile_matcher(), Arc::clone(&o200k)));
        }
        for pattern in CL100K_PATTERNS {
            matchers.push((Glob::new(pattern)?.compile_matcher(), Arc::clone(&cl100k)));
        }

        let fallback = load_or(TiktokenTokenizer::approximation(), &heuristic);

        Ok(Self { matchers, fallback })
    }

    pub fn for_model(&self, model: &str) -> Arc<dyn Tokenizer> {
        let tokenizer = self
            .matchers
            .iter()
            .find(|(matcher, _)| matcher.is_match(model))
            .map(|(_, tokenizer)| Arc::clone(tokenizer))
            .unwrap_or_else(|| Arc::clone(&self.fallback));

        metrics::counter!(
            "lumi_token_count_tier_total",
            "tier" => Self::tier_name(tokenizer.tier())
        )
        .increment(1);

        tokenizer
    }

    pub fn tier_name(tier: u8) -> &'static str {
        match tier {
            TIER_EXACT => "exact",
            TIER_APPROXIMATION => "approximation",
            TIER_HEURISTIC => "heuristic",
            _ => "unknown",
        }
    }
}

fn load_or(
    loaded: Result<TiktokenTokenizer, TokenizerError>,
    fallback: &Arc<dyn Tokenizer>,
) -> Arc<dyn Tokenizer> {
    match loaded {
        Ok(tokenizer) => Arc::new(tokenizer),
        Err(e) => {
            tracing::warn!(error = %e, "Falling back to heuristic token counting");
            Arc::clone(fallback)
        }
    }
}
