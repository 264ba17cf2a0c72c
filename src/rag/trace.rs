//! Short-lived record of which candidates grounded an answer.

use super::{round4, Candidate};
use crate::config::TraceCacheConfig;
use crate::store::KeyValueCache;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub id: i64,
    pub score: f64,
}

/// Best-effort writer for `{prefix}:rag:ctx:{trace_id}` keys.
pub struct TraceRecorder {
    cache: Option<Arc<dyn KeyValueCache>>,
    ttl: Duration,
    prefix: String,
}

impl TraceRecorder {
    pub fn new(cache: Option<Arc<dyn KeyValueCache>>, config: &TraceCacheConfig) -> Self {
        Self {
            cache: cache.filter(|_| config.enabled),
            ttl: config.ttl(),
            prefix: config.key_prefix.clone(),
        }
    }

    pub fn disabled() -> Self {
        Self {
            cache: None,
            ttl: Duration::ZERO,
            prefix: String::new(),
        }
    }

    pub fn key(&self, trace_id: &str) -> String {
        if self.prefix.is_empty() {
            format!("rag:ctx:{}", trace_id)
        } else {
            format!("{}:rag:ctx:{}", self.prefix, trace_id)
        }
    }

    /// Store the used candidates for `trace_id`. Skipped without a cache,
    /// a trace id or any candidate; failures are logged and dropped.
    pub async fn record(&self, trace_id: Option<&str>, used: &[Candidate]) {
        let Some(cache) = &self.cache else {
            return;
        };
        let Some(trace_id) = trace_id.filter(|id| !id.is_empty()) else {
            return;
        };
        if used.is_empty() {
            return;
        }

        let entries: Vec<TraceEntry> = used
            .iter()
            .map(|candidate| TraceEntry {
                id: candidate.id,
                score: round4(candidate.score),
            })
            .collect();
        let payload = match serde_json::to_string(&entries) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::debug!(trace_id, error = %e, "Failed to encode RAG context");
                return;
            }
        };

        if let Err(e) = cache.set_ex(&self.key(trace_id), payload, self.ttl).await {
            tracing::debug!(trace_id, error = %e, "Failed to cache RAG context");
        }
    }

    /// Read back a recorded context; any failure reads as absent.
    pub async fn lookup(&self, trace_id: &str) -> Option<Vec<TraceEntry>> {
        let cache = self.cache.as_ref()?;
        let raw = match cache.get(&self.key(trace_id)).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::debug!(trace_id, error = %e, "Failed to read RAG context");
                return None;
            }
        };
        serde_json::from_str(&raw).ok()
    }
}
