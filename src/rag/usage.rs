//! Token accounting, one ledger row per answered question.

use super::GenerationOutcome;
use crate::store::UsageSink;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DIRECTION_OUTBOUND: &str = "outbound";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub tenant_id: String,
    pub direction: String,
    /// Same as `total_tokens`
    pub tokens: u32,
    pub timestamp: DateTime<Utc>,
    /// Empty on zero-usage rows
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub trace_id: String,
}

impl UsageRecord {
    pub fn outbound(
        tenant_id: &str,
        model: &str,
        prompt_tokens: u32,
        completion_tokens: u32,
        trace_id: Option<&str>,
    ) -> Self {
        let total_tokens = prompt_tokens.saturating_add(completion_tokens);
        Self {
            tenant_id: tenant_id.to_string(),
            direction: DIRECTION_OUTBOUND.to_string(),
            tokens: total_tokens,
            timestamp: Utc::now(),
            model: model.to_string(),
            prompt_tokens,
            completion_tokens,
            total_tokens,
            trace_id: trace_id
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.total_tokens == 0 && self.model.is_empty()
    }
}

/// Writes usage rows; a failed write is logged and never reaches the caller.
pub struct UsageAccountant {
    sink: Arc<dyn UsageSink>,
}

impl UsageAccountant {
    pub fn new(sink: Arc<dyn UsageSink>) -> Self {
        Self { sink }
    }

    pub async fn record_success(
        &self,
        tenant_id: &str,
        outcome: &GenerationOutcome,
        trace_id: Option<&str>,
    ) {
        let record = UsageRecord::outbound(
            tenant_id,
            &outcome.model,
            outcome.prompt_tokens,
            outcome.completion_tokens,
            trace_id,
        );
        self.persist(record).await;
    }

    pub async fn record_zero(&self, tenant_id: &str, trace_id: Option<&str>) {
        self.persist(UsageRecord::outbound(tenant_id, "", 0, 0, trace_id))
            .await;
    }

    async fn persist(&self, record: UsageRecord) {
        let tenant_id = record.tenant_id.clone();
        let trace_id = record.trace_id.clone();
        let total_tokens = record.total_tokens;
        match self.sink.append(record).await {
            Ok(()) => tracing::debug!(
                tenant_id = %tenant_id,
                trace_id = %trace_id,
                total_tokens,
                "Recorded usage"
            ),
            Err(e) => tracing::error!(
                tenant_id = %tenant_id,
                trace_id = %trace_id,
                error = %e,
                "Failed to persist usage"
            ),
        }
    }
}
