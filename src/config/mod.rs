//! Configuration module for Lumi
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`LUMI_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use lumi::config::LumiConfig;
//!
//! let config = LumiConfig::default();
//! assert_eq!(config.context.token_budget, 1200);
//!
//! let toml = r#"
//! [retrieval]
//! top_k = 3
//! "#;
//! let config: LumiConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.retrieval.top_k, 3);
//! ```

pub mod error;
pub mod generation;
pub mod logging;
pub mod retrieval;
pub mod trace_cache;

pub use error::ConfigError;
pub use generation::GenerationConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use retrieval::{ContextConfig, RetrievalConfig, MAX_TOP_K};
pub use trace_cache::TraceCacheConfig;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Unified configuration for the answer pipeline and its CLI.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LumiConfig {
    /// Chat/embedding backend and retry schedule
    pub generation: GenerationConfig,
    /// Candidate selection
    pub retrieval: RetrievalConfig,
    /// Packed context budget
    pub context: ContextConfig,
    /// Diagnostic side-cache
    pub trace_cache: TraceCacheConfig,
    pub logging: LoggingConfig,
}

impl LumiConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply `LUMI_*` environment variable overrides.
    ///
    /// Invalid values are silently ignored (the previous value is kept).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(raw) = std::env::var("LUMI_AI_ENABLE") {
            self.generation.enabled = generation::parse_flag(&raw);
        }
        if let Ok(model) = std::env::var("LUMI_MODEL") {
            if !model.trim().is_empty() {
                self.generation.model = model;
            }
        }
        if let Ok(url) = std::env::var("LUMI_BASE_URL") {
            if !url.trim().is_empty() {
                self.generation.base_url = url;
            }
        }

        if let Ok(top_k) = std::env::var("LUMI_TOP_K") {
            if let Ok(k) = top_k.parse() {
                self.retrieval.top_k = k;
            }
        }
        if let Ok(threshold) = std::env::var("LUMI_SIMILARITY_THRESHOLD") {
            if let Ok(t) = threshold.parse() {
                self.retrieval.similarity_threshold = t;
            }
        }
        if let Ok(budget) = std::env::var("LUMI_CONTEXT_TOKEN_BUDGET") {
            if let Ok(b) = budget.parse() {
                self.context.token_budget = b;
            }
        }

        if let Ok(level) = std::env::var("LUMI_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("LUMI_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }

        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let generation = &self.generation;
        if generation.max_attempts == 0 {
            return Err(ConfigError::invalid(
                "generation.max_attempts",
                "at least one attempt is required",
            ));
        }
        if generation.model.trim().is_empty() {
            return Err(ConfigError::invalid(
                "generation.model",
                "model cannot be empty",
            ));
        }
        if !(0.0..=2.0).contains(&generation.temperature) {
            return Err(ConfigError::invalid(
                "generation.temperature",
                "temperature must be between 0.0 and 2.0",
            ));
        }
        if self.retrieval.top_k > MAX_TOP_K {
            return Err(ConfigError::invalid(
                "retrieval.top_k",
                format!("top_k must be at most {}", MAX_TOP_K),
            ));
        }
        if !(0.0..=1.0).contains(&self.retrieval.similarity_threshold) {
            return Err(ConfigError::invalid(
                "retrieval.similarity_threshold",
                "threshold must be between 0.0 and 1.0",
            ));
        }
        if self.context.max_chunk_tokens == 0 {
            return Err(ConfigError::invalid(
                "context.max_chunk_tokens",
                "per-entry cap must be non-zero",
            ));
        }
        if self.trace_cache.enabled && self.trace_cache.ttl_secs == 0 {
            return Err(ConfigError::invalid(
                "trace_cache.ttl_secs",
                "TTL must be non-zero when the cache is enabled",
            ));
        }

        Ok(())
    }
}
