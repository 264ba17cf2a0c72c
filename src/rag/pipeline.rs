//! The answer pipeline and its degradation order.
//!
//! | # | Condition                      | Text                 | Usage row      |
//! |---|--------------------------------|----------------------|----------------|
//! | 1 | generation disabled            | fallback             | zero           |
//! | 2 | blank question                 | insufficient context | zero           |
//! | 3 | unknown tenant                 | `Err(UnknownTenant)` | none           |
//! | 4 | retrieval fails                | fallback             | zero           |
//! | 5 | nothing packed                 | insufficient context | zero           |
//! | 6 | generation fails               | fallback             | zero           |
//! | 7 | generation returns empty text  | insufficient context | real counts    |
//! | - | success                        | generated text       | real counts    |
//!
//! Path 5 reports the local prompt estimate to the caller but never calls
//! the generation backend.

use super::fallback::{fallback_text, insufficient_context_text};
use super::{
    Candidate, ContextPacker, GenerationClient, PromptAssembler, RagError, RagResponse,
    RetrievalScorer, TraceRecorder, UsageAccountant, UsedCandidate,
};
use crate::agent::{Embedder, SharedAgent, Tokenizer};
use crate::config::LumiConfig;
use crate::logging::question_preview;
use crate::store::{KeyValueCache, KnowledgeBase, TenantDirectory, UsageSink};
use std::sync::Arc;
use tracing::instrument;

/// External services the pipeline talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub embedder: Arc<dyn Embedder>,
    pub knowledge_base: Arc<dyn KnowledgeBase>,
    pub tenants: Arc<dyn TenantDirectory>,
    pub usage: Arc<dyn UsageSink>,
    /// Trace side-cache; `None` disables it
    pub cache: Option<Arc<dyn KeyValueCache>>,
    pub agent: Arc<SharedAgent>,
    pub tokenizer: Arc<dyn Tokenizer>,
}

pub struct RagPipeline {
    enabled: bool,
    log_questions: bool,
    tenants: Arc<dyn TenantDirectory>,
    scorer: RetrievalScorer,
    packer: ContextPacker,
    prompts: PromptAssembler,
    generation: GenerationClient,
    usage: UsageAccountant,
    trace: TraceRecorder,
}

impl RagPipeline {
    pub fn new(config: &LumiConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            embedder,
            knowledge_base,
            tenants,
            usage,
            cache,
            agent,
            tokenizer,
        } = collaborators;

        Self {
            enabled: config.generation.enabled,
            log_questions: config.logging.log_questions,
            tenants,
            scorer: RetrievalScorer::new(embedder, knowledge_base, &config.retrieval),
            packer: ContextPacker::new(Arc::clone(&tokenizer), &config.context),
            prompts: PromptAssembler::new(tokenizer),
            generation: GenerationClient::new(agent, &config.generation),
            usage: UsageAccountant::new(usage),
            trace: TraceRecorder::new(cache, &config.trace_cache),
        }
    }

    /// Replace the generation client (tests shorten the backoff schedule).
    pub fn with_generation(mut self, generation: GenerationClient) -> Self {
        self.generation = generation;
        self
    }

    pub fn trace_recorder(&self) -> &TraceRecorder {
        &self.trace
    }

    /// Answer `user_text` for `tenant_id`.
    ///
    /// Only tenant resolution errors are returned; every other failure yields
    /// a degraded but complete [`RagResponse`]. Exactly one usage row is
    /// written for every `Ok` result.
    #[instrument(
        skip_all,
        fields(tenant_id = %tenant_id, trace_id = trace_id.unwrap_or_default(), lang = ?lang)
    )]
    pub async fn get_response(
        &self,
        tenant_id: &str,
        user_text: &str,
        lang: Option<&str>,
        trace_id: Option<&str>,
    ) -> Result<RagResponse, RagError> {
        let trace_id = trace_id.filter(|id| !id.is_empty());

        if !self.enabled {
            tracing::debug!("Generation disabled, returning fallback");
            return Ok(self
                .degrade(tenant_id, trace_id, "disabled", fallback_text(lang), Vec::new())
                .await);
        }

        let question = user_text.trim();
        if question.is_empty() {
            return Ok(self
                .degrade(
                    tenant_id,
                    trace_id,
                    "empty_question",
                    insufficient_context_text(lang),
                    Vec::new(),
                )
                .await);
        }

        let tenant = match self.tenants.get_tenant(tenant_id).await {
            Ok(Some(tenant)) => tenant,
            Ok(None) => {
                record_outcome("unknown_tenant");
                return Err(RagError::UnknownTenant(tenant_id.to_string()));
            }
            Err(e) => {
                record_outcome("tenant_lookup_failed");
                return Err(RagError::TenantLookup(e));
            }
        };

        tracing::info!(
            question = question_preview(question, self.log_questions).as_deref(),
            "Answering question"
        );

        let candidates = match self.scorer.retrieve(tenant_id, question).await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::error!(error = %e, "FAQ retrieval failed");
                return Ok(self
                    .degrade(
                        tenant_id,
                        trace_id,
                        "retrieval_failed",
                        fallback_text(lang),
                        Vec::new(),
                    )
                    .await);
            }
        };

        let packed = self.packer.pack(&candidates);
        let prompt = self.prompts.build(
            lang,
            &packed.text,
            question,
            tenant.system_prompt.as_deref(),
        );
        let prompt_estimate = self.prompts.estimate_tokens(&prompt);

        if packed.is_empty() {
            tracing::info!(
                retrieved = candidates.len(),
                prompt_estimate,
                "No grounding context, skipping generation"
            );
            let mut response = self
                .degrade(
                    tenant_id,
                    trace_id,
                    "no_context",
                    insufficient_context_text(lang),
                    Vec::new(),
                )
                .await;
            response.prompt_tokens = prompt_estimate;
            response.total_tokens = prompt_estimate;
            return Ok(response);
        }

        let result = self.generation.generate(prompt, prompt_estimate).await;
        self.trace.record(trace_id, &packed.used_candidates).await;
        let used = used_view(&packed.used_candidates);

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, attempts = e.attempts(), "Chat completion failed");
                return Ok(self
                    .degrade(
                        tenant_id,
                        trace_id,
                        "generation_failed",
                        fallback_text(lang),
                        used,
                    )
                    .await);
            }
        };

        self.usage.record_success(tenant_id, &outcome, trace_id).await;

        let text = if outcome.text.is_empty() {
            record_outcome("empty_completion");
            insufficient_context_text(lang).to_string()
        } else {
            record_outcome("answered");
            outcome.text
        };

        tracing::info!(
            model = %outcome.model,
            attempts = outcome.attempts,
            used_candidates = used.len(),
            prompt_tokens = outcome.prompt_tokens,
            completion_tokens = outcome.completion_tokens,
            "Answered question"
        );

        Ok(RagResponse {
            text,
            prompt_tokens: outcome.prompt_tokens,
            completion_tokens: outcome.completion_tokens,
            total_tokens: outcome.total_tokens,
            model: outcome.model,
            used_candidates: used,
        })
    }

    /// Zero-usage row plus a static response.
    async fn degrade(
        &self,
        tenant_id: &str,
        trace_id: Option<&str>,
        outcome: &'static str,
        text: &str,
        used: Vec<UsedCandidate>,
    ) -> RagResponse {
        record_outcome(outcome);
        self.usage.record_zero(tenant_id, trace_id).await;
        RagResponse::canned(text, used)
    }
}

fn used_view(candidates: &[Candidate]) -> Vec<UsedCandidate> {
    candidates.iter().map(Candidate::to_used).collect()
}

fn record_outcome(outcome: &'static str) {
    metrics::counter!("lumi_rag_responses_total", "outcome" => outcome).increment(1);
}
