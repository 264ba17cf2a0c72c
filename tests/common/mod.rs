//! Shared test utilities for Lumi integration tests.
//!
//! Provides scripted agents, counting collaborators and a small knowledge
//! base so each test file can assemble a pipeline in a few lines.

#![allow(dead_code)]

use async_trait::async_trait;
use lumi::agent::tokenizer::WhitespaceTokenizer;
use lumi::agent::{
    AgentError, ChatCompletionRequest, ChatCompletionResponse, Choice, Embedder, InferenceAgent,
    ResponseMessage, Role, SharedAgent, Usage,
};
use lumi::config::LumiConfig;
use lumi::rag::{Collaborators, GenerationClient, RagPipeline, RetryPolicy};
use lumi::store::memory::{FaqRecord, TenantRecord};
use lumi::store::{
    KeyValueCache, KnowledgeBase, MemoryCache, MemoryStore, RawCandidate, StoreError,
    TenantConfig, TenantDirectory,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// =============================================================================
// Fixtures
// =============================================================================

pub const TENANT: &str = "acme";

/// Two-dimensional embeddings keep distances easy to reason about:
/// the question vector is [1, 0].
pub fn acme_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    store.insert_tenant(TenantRecord {
        id: TENANT.to_string(),
        system_prompt: Some("Always sign as the Acme team.".to_string()),
        faqs: vec![
            faq(1, "What are your opening hours?", "Nine to six, Monday to Friday.", [1.0, 0.0]),
            faq(2, "Do you open on Sunday?", "No, we are closed on Sunday.", [0.9, 0.3]),
            faq(3, "Where can I park?", "Free parking behind the shop.", [0.0, 1.0]),
        ],
    });
    Arc::new(store)
}

pub fn faq(id: i64, question: &str, answer: &str, embedding: [f32; 2]) -> FaqRecord {
    FaqRecord {
        id,
        question: question.to_string(),
        answer: answer.to_string(),
        embedding: Some(embedding.to_vec()),
    }
}

pub fn completion(text: &str, prompt_tokens: Option<u32>, completion_tokens: Option<u32>) -> ChatCompletionResponse {
    ChatCompletionResponse {
        id: Some("chatcmpl-test".to_string()),
        model: Some("gpt-4o-mini-2024-07-18".to_string()),
        choices: vec![Choice {
            index: 0,
            message: ResponseMessage {
                role: Some(Role::Assistant),
                content: Some(text.to_string()),
            },
            finish_reason: Some("stop".to_string()),
        }],
        usage: Some(Usage {
            prompt_tokens,
            completion_tokens,
            total_tokens: None,
        }),
    }
}

pub fn server_error() -> AgentError {
    AgentError::Upstream {
        status: 503,
        message: "overloaded".to_string(),
    }
}

// =============================================================================
// Scripted agent
// =============================================================================

type Reply = Result<ChatCompletionResponse, AgentError>;

/// Replays scripted replies in order, then repeats `fallback`.
pub struct ScriptedAgent {
    script: Mutex<VecDeque<Reply>>,
    fallback: fn() -> Reply,
    calls: AtomicUsize,
    requests: Mutex<Vec<ChatCompletionRequest>>,
}

impl ScriptedAgent {
    pub fn new(script: Vec<Reply>, fallback: fn() -> Reply) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn answering(text: &'static str) -> Arc<Self> {
        let agent = Self::new(Vec::new(), || Err(server_error()));
        agent
            .script
            .lock()
            .unwrap()
            .push_back(Ok(completion(text, Some(150), Some(9))));
        agent
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ChatCompletionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl InferenceAgent for ScriptedAgent {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat_completion(&self, request: ChatCompletionRequest) -> Reply {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(self.fallback)
    }
}

// =============================================================================
// Counting collaborators
// =============================================================================

/// Embeds everything as [1, 0] and counts calls; optionally fails.
pub struct StubEmbedder {
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl StubEmbedder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: true,
        })
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AgentError::Network("connection reset".to_string()));
        }
        Ok(vec![1.0, 0.0])
    }
}

/// Delegates to the memory store and counts searches.
pub struct CountingKnowledgeBase {
    inner: Arc<MemoryStore>,
    pub searches: AtomicUsize,
}

impl CountingKnowledgeBase {
    pub fn new(inner: Arc<MemoryStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            searches: AtomicUsize::new(0),
        })
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KnowledgeBase for CountingKnowledgeBase {
    async fn search(
        &self,
        tenant_id: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<RawCandidate>, StoreError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        self.inner.search(tenant_id, embedding, limit).await
    }
}

/// Returns fixed rows regardless of the query.
pub struct FixedKnowledgeBase(pub Vec<RawCandidate>);

#[async_trait]
impl KnowledgeBase for FixedKnowledgeBase {
    async fn search(
        &self,
        _tenant_id: &str,
        _embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<RawCandidate>, StoreError> {
        Ok(self.0.iter().take(limit).cloned().collect())
    }
}

/// Tenant directory whose backing store is down; counts lookups.
pub struct UnreachableTenants {
    pub lookups: AtomicUsize,
}

impl UnreachableTenants {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            lookups: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TenantDirectory for UnreachableTenants {
    async fn get_tenant(&self, _tenant_id: &str) -> Result<Option<TenantConfig>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

// =============================================================================
// Pipeline harness
// =============================================================================

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub cache: Arc<MemoryCache>,
    pub embedder: Arc<StubEmbedder>,
    pub knowledge_base: Arc<CountingKnowledgeBase>,
    pub agent: Arc<ScriptedAgent>,
    pub pipeline: RagPipeline,
}

impl Harness {
    pub fn new(config: LumiConfig, agent: Arc<ScriptedAgent>) -> Self {
        Self::with_embedder(config, agent, StubEmbedder::new())
    }

    pub fn with_embedder(
        config: LumiConfig,
        agent: Arc<ScriptedAgent>,
        embedder: Arc<StubEmbedder>,
    ) -> Self {
        Self::build(config, agent, embedder, None)
    }

    /// Resolve tenants through `tenants` instead of the memory store.
    pub fn with_tenants(
        config: LumiConfig,
        agent: Arc<ScriptedAgent>,
        tenants: Arc<dyn TenantDirectory>,
    ) -> Self {
        Self::build(config, agent, StubEmbedder::new(), Some(tenants))
    }

    fn build(
        config: LumiConfig,
        agent: Arc<ScriptedAgent>,
        embedder: Arc<StubEmbedder>,
        tenants: Option<Arc<dyn TenantDirectory>>,
    ) -> Self {
        let store = acme_store();
        let cache = Arc::new(MemoryCache::new());
        let knowledge_base = CountingKnowledgeBase::new(Arc::clone(&store));
        let shared = Arc::new(SharedAgent::with_agent(agent.clone()));

        let collaborators = Collaborators {
            embedder: embedder.clone(),
            knowledge_base: knowledge_base.clone(),
            tenants: tenants.unwrap_or_else(|| store.clone() as Arc<dyn TenantDirectory>),
            usage: store.clone(),
            cache: Some(cache.clone() as Arc<dyn KeyValueCache>),
            agent: Arc::clone(&shared),
            tokenizer: Arc::new(WhitespaceTokenizer),
        };
        // 1ms backoff so retry tests run in real time
        let generation = GenerationClient::new(shared, &config.generation).with_policy(
            RetryPolicy::new(
                config.generation.max_attempts,
                vec![Duration::from_millis(1)],
            ),
        );
        let pipeline = RagPipeline::new(&config, collaborators).with_generation(generation);

        Self {
            store,
            cache,
            embedder,
            knowledge_base,
            agent,
            pipeline,
        }
    }

    pub async fn cache_entry(&self, key: &str) -> Option<String> {
        self.cache.get(key).await.unwrap()
    }

    pub fn usage_rows(&self) -> usize {
        self.store.usage_for(TENANT).len()
    }
}
