//! Collaborator contracts for the answer pipeline.
//!
//! The pipeline never talks to a database, vector index or cache directly; it
//! goes through these traits. `memory` provides in-process implementations used
//! by the CLI and the test-suite.

mod backfill;
mod error;
pub mod memory;

pub use backfill::backfill_missing_embeddings;
pub use error::*;
pub use memory::{KnowledgeBaseFile, MemoryCache, MemoryStore};

use crate::rag::UsageRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A knowledge-base row as returned by similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCandidate {
    pub id: i64,
    pub question: String,
    pub answer: String,
    /// Cosine distance to the query; lower is more similar
    pub distance: f64,
}

/// Per-tenant settings the pipeline needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TenantConfig {
    pub id: String,
    /// Extra system instructions appended after the baseline guardrails
    #[serde(default)]
    pub system_prompt: Option<String>,
}

/// Vector search over a tenant's FAQ entries.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Entries of `tenant_id` that have an embedding, ascending by distance,
    /// at most `limit` of them.
    async fn search(
        &self,
        tenant_id: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<RawCandidate>, StoreError>;
}

#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// `Ok(None)` means the tenant does not exist.
    async fn get_tenant(&self, tenant_id: &str) -> Result<Option<TenantConfig>, StoreError>;
}

/// Append-only usage ledger.
#[async_trait]
pub trait UsageSink: Send + Sync {
    async fn append(&self, record: UsageRecord) -> Result<(), StoreError>;
}

/// Best-effort key-value store with expiry.
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
}
