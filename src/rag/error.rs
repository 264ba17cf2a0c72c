//! Error types for the answer pipeline

use crate::agent::AgentError;
use crate::store::StoreError;
use thiserror::Error;

/// Errors returned to the caller of [`RagPipeline::get_response`].
///
/// Every other failure is absorbed into a degraded response.
///
/// [`RagPipeline::get_response`]: super::RagPipeline::get_response
#[derive(Debug, Error)]
pub enum RagError {
    #[error("Unknown tenant {0}")]
    UnknownTenant(String),

    #[error("Tenant lookup failed: {0}")]
    TenantLookup(#[source] StoreError),
}

/// Question embedding or knowledge-base search failed.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Embedding failed: {0}")]
    Embedding(#[source] AgentError),

    #[error("Knowledge base search failed: {0}")]
    Search(#[source] StoreError),
}

/// Generation could not produce an outcome.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The backend handle could not be created (e.g. missing API key).
    #[error("Generation backend unavailable: {0}")]
    Unavailable(#[source] AgentError),

    #[error("Generation failed after {attempts} attempt(s): {source}")]
    Failed {
        attempts: u32,
        #[source]
        source: AgentError,
    },
}

impl GenerationError {
    pub fn attempts(&self) -> u32 {
        match self {
            GenerationError::Unavailable(_) => 0,
            GenerationError::Failed { attempts, .. } => *attempts,
        }
    }
}
