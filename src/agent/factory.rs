//! Agent construction and the process-wide shared handle.

use super::{openai::OpenAIAgent, AgentError, InferenceAgent};
use crate::config::GenerationConfig;
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::OnceCell;

type AgentInit = dyn Fn() -> Result<Arc<dyn InferenceAgent>, AgentError> + Send + Sync;

/// Create the OpenAI agent described by `config`.
///
/// The API key is read from the environment variable named by
/// `config.api_key_env`; a missing or empty key is a configuration error.
pub fn create_agent(
    config: &GenerationConfig,
    client: Arc<Client>,
) -> Result<Arc<dyn InferenceAgent>, AgentError> {
    let api_key = std::env::var(&config.api_key_env).map_err(|e| {
        AgentError::Configuration(format!(
            "Failed to read API key from env var '{}': {}",
            config.api_key_env, e
        ))
    })?;
    if api_key.trim().is_empty() {
        return Err(AgentError::Configuration(format!(
            "API key env var '{}' is empty",
            config.api_key_env
        )));
    }

    Ok(Arc::new(OpenAIAgent::new(
        "openai".to_string(),
        config.base_url.clone(),
        api_key,
        config.request_timeout(),
        client,
    )))
}

/// Lazily created, shared generation backend.
///
/// The first caller of [`SharedAgent::get`] runs the initializer while
/// concurrent callers wait on the same cell; once set, reads take no lock.
/// A failed initialization leaves the cell empty so a later call can retry.
///
/// # Examples
///
/// ```
/// use lumi::agent::SharedAgent;
/// use lumi::config::GenerationConfig;
///
/// let shared = SharedAgent::new(GenerationConfig::default());
/// assert!(!shared.is_initialized());
/// ```
pub struct SharedAgent {
    cell: OnceCell<Arc<dyn InferenceAgent>>,
    init: Box<AgentInit>,
}

impl SharedAgent {
    /// Handle that builds an [`OpenAIAgent`] from `config` on first use.
    pub fn new(config: GenerationConfig) -> Self {
        Self::from_fn(move || create_agent(&config, Arc::new(Client::new())))
    }

    pub fn from_fn<F>(init: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn InferenceAgent>, AgentError> + Send + Sync + 'static,
    {
        Self {
            cell: OnceCell::new(),
            init: Box::new(init),
        }
    }

    /// Handle around an already-built agent.
    pub fn with_agent(agent: Arc<dyn InferenceAgent>) -> Self {
        Self::from_fn(move || Ok(Arc::clone(&agent)))
    }

    pub async fn get(&self) -> Result<Arc<dyn InferenceAgent>, AgentError> {
        let agent = self
            .cell
            .get_or_try_init(|| async {
                let agent = (self.init)()?;
                tracing::debug!(agent = agent.name(), "Initialized generation backend");
                Ok::<_, AgentError>(agent)
            })
            .await?;
        Ok(Arc::clone(agent))
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    /// Drop the cached agent; the next `get` initializes again.
    pub fn reset(&mut self) {
        self.cell.take();
    }
}
