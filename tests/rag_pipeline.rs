//! End-to-end tests for the answer pipeline over in-memory collaborators.

mod common;

use common::{
    completion, server_error, FixedKnowledgeBase, Harness, ScriptedAgent, StubEmbedder,
    UnreachableTenants, TENANT,
};
use lumi::agent::tokenizer::WhitespaceTokenizer;
use lumi::agent::{AgentError, Role, Tokenizer};
use lumi::config::{ContextConfig, LumiConfig, RetrievalConfig};
use lumi::rag::{
    fallback_text, insufficient_context_text, Candidate, ContextPacker, RagError,
    RetrievalScorer,
};
use lumi::store::RawCandidate;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn rate_limited() -> Result<lumi::agent::ChatCompletionResponse, AgentError> {
    Err(AgentError::RateLimited("quota".to_string()))
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn empty_question_returns_insufficient_context() {
    let h = Harness::new(LumiConfig::default(), ScriptedAgent::answering("unused"));

    let response = h
        .pipeline
        .get_response(TENANT, "   ", Some("fr"), Some("msg-1"))
        .await
        .unwrap();

    assert_eq!(response.text, insufficient_context_text(Some("fr")));
    assert!(response.used_candidates.is_empty());
    assert_eq!(
        (response.prompt_tokens, response.completion_tokens, response.total_tokens),
        (0, 0, 0)
    );
    assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.agent.calls(), 0);
}

#[tokio::test]
async fn threshold_keeps_two_of_three_candidates() {
    let scorer = RetrievalScorer::new(
        StubEmbedder::new(),
        Arc::new(FixedKnowledgeBase(vec![
            RawCandidate {
                id: 1,
                question: "q1".to_string(),
                answer: "a1".to_string(),
                distance: 0.1,
            },
            RawCandidate {
                id: 2,
                question: "q2".to_string(),
                answer: "a2".to_string(),
                distance: 0.2,
            },
            RawCandidate {
                id: 3,
                question: "q3".to_string(),
                answer: "a3".to_string(),
                distance: 0.7,
            },
        ])),
        &RetrievalConfig {
            top_k: 6,
            similarity_threshold: 0.75,
        },
    );

    let candidates = scorer.retrieve(TENANT, "hours?").await.unwrap();
    let ids: Vec<i64> = candidates.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn oversized_single_candidate_is_trimmed_into_budget() {
    let words = |prefix: &str, n: usize| {
        (0..n)
            .map(|i| format!("{}{}", prefix, i))
            .collect::<Vec<_>>()
            .join(" ")
    };
    let candidate = Candidate {
        id: 1,
        question: words("q", 8),
        answer: words("a", 69),
        score: 0.9,
    };
    let packer = ContextPacker::new(
        Arc::new(WhitespaceTokenizer),
        &ContextConfig {
            token_budget: 50,
            max_chunk_tokens: 400,
        },
    );
    assert_eq!(WhitespaceTokenizer.count_tokens(&packer.summarize(1, &candidate)), 80);

    let packed = packer.pack(&[candidate]);

    assert_eq!(packed.used_candidates.len(), 1);
    assert_eq!(WhitespaceTokenizer.count_tokens(&packed.text), 50);
}

#[tokio::test]
async fn recovers_after_three_server_errors() {
    let agent = ScriptedAgent::new(
        vec![
            Err(server_error()),
            Err(server_error()),
            Err(server_error()),
            Ok(completion("We open at nine.", Some(150), Some(9))),
        ],
        rate_limited,
    );
    let h = Harness::new(LumiConfig::default(), agent);

    let response = h
        .pipeline
        .get_response(TENANT, "When do you open?", Some("en"), None)
        .await
        .unwrap();

    assert_eq!(h.agent.calls(), 4);
    assert_eq!(response.text, "We open at nine.");
    assert_ne!(response.text, fallback_text(Some("en")));
    assert_eq!(response.model, "gpt-4o-mini-2024-07-18");
}

#[tokio::test]
async fn unknown_tenant_is_a_caller_error() {
    let h = Harness::new(LumiConfig::default(), ScriptedAgent::answering("unused"));

    let result = h
        .pipeline
        .get_response("globex", "When do you open?", None, Some("msg-2"))
        .await;

    assert!(matches!(result, Err(RagError::UnknownTenant(ref id)) if id == "globex"));
    assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.knowledge_base.searches(), 0);
    assert_eq!(h.agent.calls(), 0);
    assert_eq!(h.store.usage_count(), 0);
}

#[tokio::test]
async fn tenant_lookup_failure_is_propagated() {
    let tenants = UnreachableTenants::new();
    let h = Harness::with_tenants(
        LumiConfig::default(),
        ScriptedAgent::answering("unused"),
        tenants.clone(),
    );

    let result = h
        .pipeline
        .get_response(TENANT, "When do you open?", None, Some("msg-3"))
        .await;

    assert!(matches!(result, Err(RagError::TenantLookup(_))));
    assert_eq!(tenants.lookups.load(Ordering::SeqCst), 1);
    assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.knowledge_base.searches(), 0);
    assert_eq!(h.agent.calls(), 0);
    assert_eq!(h.store.usage_count(), 0);
    let key = h.pipeline.trace_recorder().key("msg-3");
    assert!(h.cache_entry(&key).await.is_none());
}

#[tokio::test]
async fn disabled_generation_skips_tenant_lookup() {
    let mut config = LumiConfig::default();
    config.generation.enabled = false;
    let tenants = UnreachableTenants::new();
    let h = Harness::with_tenants(config, ScriptedAgent::answering("unused"), tenants.clone());

    let response = h
        .pipeline
        .get_response(TENANT, "When do you open?", None, None)
        .await
        .unwrap();

    assert_eq!(response.text, fallback_text(None));
    assert_eq!(tenants.lookups.load(Ordering::SeqCst), 0);
    assert_eq!(h.store.usage_count(), 1);
    assert!(h.store.usage_for(TENANT)[0].is_zero());
}

// =============================================================================
// Degradation paths
// =============================================================================

#[tokio::test]
async fn disabled_generation_short_circuits_before_retrieval() {
    let mut config = LumiConfig::default();
    config.generation.enabled = false;
    let h = Harness::new(config, ScriptedAgent::answering("unused"));

    let response = h
        .pipeline
        .get_response(TENANT, "When do you open?", Some("fr-FR"), None)
        .await
        .unwrap();

    assert_eq!(response.text, fallback_text(Some("fr")));
    assert!(response.used_candidates.is_empty());
    assert_eq!(response.model, "");
    assert_eq!(h.knowledge_base.searches(), 0);
    assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.agent.calls(), 0);
}

#[tokio::test]
async fn retrieval_failure_returns_fallback() {
    let h = Harness::with_embedder(
        LumiConfig::default(),
        ScriptedAgent::answering("unused"),
        StubEmbedder::failing(),
    );

    let response = h
        .pipeline
        .get_response(TENANT, "When do you open?", None, Some("msg-3"))
        .await
        .unwrap();

    assert_eq!(response.text, fallback_text(None));
    assert!(response.used_candidates.is_empty());
    assert_eq!(response.total_tokens, 0);
    assert_eq!(h.agent.calls(), 0);

    let rows = h.store.usage_for(TENANT);
    assert_eq!(rows.len(), 1);
    assert!(rows[0].is_zero());
    assert_eq!(rows[0].trace_id, "msg-3");
}

#[tokio::test]
async fn empty_context_skips_generation_and_reports_estimate() {
    let mut config = LumiConfig::default();
    config.context.token_budget = 0;
    let h = Harness::new(config, ScriptedAgent::answering("unused"));

    let response = h
        .pipeline
        .get_response(TENANT, "When do you open?", None, Some("msg-4"))
        .await
        .unwrap();

    assert_eq!(response.text, insufficient_context_text(None));
    assert!(response.used_candidates.is_empty());
    assert!(response.prompt_tokens > 0);
    assert_eq!(response.completion_tokens, 0);
    assert_eq!(response.total_tokens, response.prompt_tokens);
    assert_eq!(h.agent.calls(), 0);
    assert!(h.pipeline.trace_recorder().lookup("msg-4").await.is_none());
}

#[tokio::test]
async fn permanent_rate_limit_makes_four_attempts_and_keeps_candidates() {
    let h = Harness::new(LumiConfig::default(), ScriptedAgent::new(Vec::new(), rate_limited));

    let response = h
        .pipeline
        .get_response(TENANT, "When do you open?", Some("en"), Some("msg-5"))
        .await
        .unwrap();

    assert_eq!(h.agent.calls(), 4);
    assert_eq!(response.text, fallback_text(Some("en")));
    assert_eq!(response.total_tokens, 0);
    assert!(!response.used_candidates.is_empty());

    let rows = h.store.usage_for(TENANT);
    assert_eq!(rows.len(), 1);
    assert!(rows[0].is_zero());

    // the trace is written once the attempt resolved, even on failure
    let trace = h.pipeline.trace_recorder().lookup("msg-5").await.unwrap();
    assert_eq!(trace.len(), response.used_candidates.len());
}

#[tokio::test]
async fn empty_completion_uses_insufficient_text_with_real_counts() {
    let agent = ScriptedAgent::new(vec![Ok(completion("   ", Some(80), Some(0)))], rate_limited);
    let h = Harness::new(LumiConfig::default(), agent);

    let response = h
        .pipeline
        .get_response(TENANT, "When do you open?", Some("fr"), None)
        .await
        .unwrap();

    assert_eq!(response.text, insufficient_context_text(Some("fr")));
    assert_eq!(response.prompt_tokens, 80);
    assert_eq!(response.total_tokens, 80);
    assert!(!response.used_candidates.is_empty());
}

// =============================================================================
// Success path
// =============================================================================

#[tokio::test]
async fn success_records_usage_trace_and_prompt_order() {
    let h = Harness::new(LumiConfig::default(), ScriptedAgent::answering("  Nine to six.  "));

    let response = h
        .pipeline
        .get_response(TENANT, "  When do you open?  ", Some("EN"), Some("msg-6"))
        .await
        .unwrap();

    assert_eq!(response.text, "Nine to six.");
    assert_eq!(response.prompt_tokens, 150);
    assert_eq!(response.completion_tokens, 9);
    assert_eq!(response.total_tokens, 159);

    // best match first, scores rounded for display
    let ids: Vec<i64> = response.used_candidates.iter().map(|c| c.id).collect();
    assert_eq!(ids[..2], [1, 2]);
    assert_eq!(response.used_candidates[0].score, 1.0);
    assert_eq!(response.used_candidates[1].score, 0.9487);

    let rows = h.store.usage_for(TENANT);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].total_tokens, rows[0].prompt_tokens + rows[0].completion_tokens);
    assert_eq!(rows[0].model, "gpt-4o-mini-2024-07-18");
    assert_eq!(rows[0].trace_id, "msg-6");

    let raw = h.cache_entry("lumi:rag:ctx:msg-6").await.unwrap();
    assert!(raw.starts_with(r#"[{"id":1,"score":1.0}"#));

    let request = h.agent.last_request().unwrap();
    let roles: Vec<Role> = request.messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::System, Role::System, Role::System, Role::User]);
    assert_eq!(request.messages[2].content, "Always sign as the Acme team.");
    assert!(request.messages[3].content.contains("User question: \"When do you open?\""));
    assert!(request.messages[3].content.contains("Answer in en."));
    assert_eq!(request.max_tokens, Some(300));
}

#[tokio::test]
async fn missing_prompt_usage_falls_back_to_estimate() {
    let agent = ScriptedAgent::new(vec![Ok(completion("Nine to six.", None, Some(3)))], rate_limited);
    let h = Harness::new(LumiConfig::default(), agent);

    let response = h
        .pipeline
        .get_response(TENANT, "When do you open?", None, None)
        .await
        .unwrap();

    assert!(response.prompt_tokens > 0);
    assert_eq!(response.total_tokens, response.prompt_tokens + 3);

    let rows = h.store.usage_for(TENANT);
    assert_eq!(rows[0].prompt_tokens, response.prompt_tokens);
    assert!(uuid::Uuid::parse_str(&rows[0].trace_id).is_ok());
}

// =============================================================================
// Invariants
// =============================================================================

#[tokio::test]
async fn every_outcome_writes_exactly_one_usage_row() {
    let cases: Vec<(LumiConfig, &str)> = vec![
        (LumiConfig::default(), ""),
        (LumiConfig::default(), "When do you open?"),
        (
            {
                let mut config = LumiConfig::default();
                config.generation.enabled = false;
                config
            },
            "When do you open?",
        ),
        (
            {
                let mut config = LumiConfig::default();
                config.context.token_budget = 0;
                config
            },
            "When do you open?",
        ),
    ];

    for (config, question) in cases {
        let h = Harness::new(config, ScriptedAgent::answering("Nine to six."));
        h.pipeline
            .get_response(TENANT, question, None, None)
            .await
            .unwrap();
        assert_eq!(h.usage_rows(), 1, "question {:?}", question);
    }

    let h = Harness::new(LumiConfig::default(), ScriptedAgent::new(Vec::new(), rate_limited));
    h.pipeline
        .get_response(TENANT, "When do you open?", None, None)
        .await
        .unwrap();
    assert_eq!(h.usage_rows(), 1);
}

#[tokio::test]
async fn concurrent_questions_share_one_backend() {
    let agent = ScriptedAgent::new(Vec::new(), || Ok(completion("Nine to six.", Some(10), Some(3))));
    let h = Arc::new(Harness::new(LumiConfig::default(), agent));

    let mut handles = Vec::new();
    for i in 0..8 {
        let h = Arc::clone(&h);
        handles.push(tokio::spawn(async move {
            let trace_id = format!("msg-{}", i);
            h.pipeline
                .get_response(TENANT, "When do you open?", None, Some(trace_id.as_str()))
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().text, "Nine to six.");
    }

    assert_eq!(h.agent.calls(), 8);
    assert_eq!(h.usage_rows(), 8);
}
