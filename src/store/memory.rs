//! In-process collaborators backed by DashMap.
//!
//! `MemoryStore` holds tenants and their FAQ entries (loadable from a JSON
//! file), answers cosine-distance searches and keeps a per-tenant usage ledger.
//! `MemoryCache` is a TTL key-value cache.

use super::{
    KeyValueCache, KnowledgeBase, RawCandidate, StoreError, TenantConfig, TenantDirectory,
    UsageSink,
};
use crate::rag::UsageRecord;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};

/// On-disk knowledge-base layout.
///
/// ```json
/// {"tenants": [{"id": "acme", "system_prompt": "...",
///   "faqs": [{"id": 1, "question": "...", "answer": "...", "embedding": [0.1, ...]}]}]}
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeBaseFile {
    #[serde(default)]
    pub tenants: Vec<TenantRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub faqs: Vec<FaqRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaqRecord {
    pub id: i64,
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// FAQ entry that still needs an embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEmbedding {
    pub tenant_id: String,
    pub faq_id: i64,
    pub text: String,
}

pub struct MemoryStore {
    tenants: DashMap<String, TenantRecord>,
    usage: DashMap<String, Vec<UsageRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tenants: DashMap::new(),
            usage: DashMap::new(),
        }
    }

    pub fn from_file_contents(file: KnowledgeBaseFile) -> Self {
        let store = Self::new();
        for tenant in file.tenants {
            store.insert_tenant(tenant);
        }
        store
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Err(StoreError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let file: KnowledgeBaseFile = serde_json::from_str(&content)?;
        Ok(Self::from_file_contents(file))
    }

    /// Write tenants back as a knowledge-base file, sorted by tenant id.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let mut tenants: Vec<TenantRecord> =
            self.tenants.iter().map(|entry| entry.value().clone()).collect();
        tenants.sort_by(|a, b| a.id.cmp(&b.id));

        let content = serde_json::to_string_pretty(&KnowledgeBaseFile { tenants })?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn insert_tenant(&self, tenant: TenantRecord) {
        self.tenants.insert(tenant.id.clone(), tenant);
    }

    pub fn tenant_count(&self) -> usize {
        self.tenants.len()
    }

    /// Entries without an embedding, optionally restricted to one tenant.
    /// The text to embed is the question and answer separated by a blank line.
    pub fn missing_embeddings(&self, tenant_id: Option<&str>) -> Vec<PendingEmbedding> {
        let mut pending = Vec::new();
        for tenant in self.tenants.iter() {
            if tenant_id.is_some_and(|wanted| wanted != tenant.id) {
                continue;
            }
            for faq in tenant.faqs.iter().filter(|faq| faq.embedding.is_none()) {
                pending.push(PendingEmbedding {
                    tenant_id: tenant.id.clone(),
                    faq_id: faq.id,
                    text: format!("{}\n\n{}", faq.question, faq.answer),
                });
            }
        }
        pending.sort_by(|a, b| (&a.tenant_id, a.faq_id).cmp(&(&b.tenant_id, b.faq_id)));
        pending
    }

    /// Returns false when the tenant or entry does not exist.
    pub fn set_embedding(&self, tenant_id: &str, faq_id: i64, embedding: Vec<f32>) -> bool {
        let Some(mut tenant) = self.tenants.get_mut(tenant_id) else {
            return false;
        };
        match tenant.faqs.iter_mut().find(|faq| faq.id == faq_id) {
            Some(faq) => {
                faq.embedding = Some(embedding);
                true
            }
            None => false,
        }
    }

    pub fn usage_for(&self, tenant_id: &str) -> Vec<UsageRecord> {
        self.usage
            .get(tenant_id)
            .map(|records| records.value().clone())
            .unwrap_or_default()
    }

    pub fn usage_count(&self) -> usize {
        self.usage.iter().map(|records| records.len()).sum()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// `1 - cosine similarity`; vectors of different length or zero norm are
/// maximally distant.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[async_trait]
impl KnowledgeBase for MemoryStore {
    async fn search(
        &self,
        tenant_id: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<RawCandidate>, StoreError> {
        let Some(tenant) = self.tenants.get(tenant_id) else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<RawCandidate> = tenant
            .faqs
            .iter()
            .filter_map(|faq| {
                let stored = faq.embedding.as_ref()?;
                Some(RawCandidate {
                    id: faq.id,
                    question: faq.question.clone(),
                    answer: faq.answer.clone(),
                    distance: cosine_distance(embedding, stored),
                })
            })
            .collect();
        rows.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        rows.truncate(limit);
        Ok(rows)
    }
}

#[async_trait]
impl TenantDirectory for MemoryStore {
    async fn get_tenant(&self, tenant_id: &str) -> Result<Option<TenantConfig>, StoreError> {
        Ok(self.tenants.get(tenant_id).map(|tenant| TenantConfig {
            id: tenant.id.clone(),
            system_prompt: tenant.system_prompt.clone(),
        }))
    }
}

#[async_trait]
impl UsageSink for MemoryStore {
    async fn append(&self, record: UsageRecord) -> Result<(), StoreError> {
        self.usage
            .entry(record.tenant_id.clone())
            .or_default()
            .push(record);
        Ok(())
    }
}

/// TTL cache; expired keys are dropped when read.
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, (String, Instant)>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every expired entry, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, (_, expires_at)| *expires_at > now);
        before - self.entries.len()
    }
}

#[async_trait]
impl KeyValueCache for MemoryCache {
    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        self.entries
            .insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            None => return Ok(None),
            Some(entry) if entry.1 > now => return Ok(Some(entry.0.clone())),
            Some(_) => true,
        };
        if expired {
            self.entries.remove(key);
        }
        Ok(None)
    }
}
