//! `lumi ask` command

use crate::agent::{AgentEmbedder, SharedAgent, TokenizerRegistry};
use crate::cli::{load_config, output, AskArgs};
use crate::config::LumiConfig;
use crate::rag::{Collaborators, RagPipeline};
use crate::store::{MemoryCache, MemoryStore};
use std::sync::Arc;

/// Apply command-line overrides on top of file and environment settings.
pub fn apply_ask_overrides(mut config: LumiConfig, args: &AskArgs) -> LumiConfig {
    if let Some(ref model) = args.model {
        config.generation.model = model.clone();
    }
    if let Some(ref level) = args.log_level {
        config.logging.level = level.clone();
    }
    config
}

/// Build a pipeline over in-memory collaborators.
pub fn build_pipeline(
    config: &LumiConfig,
    store: Arc<MemoryStore>,
) -> Result<RagPipeline, Box<dyn std::error::Error>> {
    let agent = Arc::new(SharedAgent::new(config.generation.clone()));
    let embedder = AgentEmbedder::new(Arc::clone(&agent), config.generation.embedding_model.clone());
    let tokenizer = TokenizerRegistry::new()?.for_model(&config.generation.model);

    let collaborators = Collaborators {
        embedder: Arc::new(embedder),
        knowledge_base: store.clone(),
        tenants: store.clone(),
        usage: store,
        cache: Some(Arc::new(MemoryCache::new())),
        agent,
        tokenizer,
    };
    Ok(RagPipeline::new(config, collaborators))
}

/// Handle `lumi ask` command
pub async fn handle_ask(args: &AskArgs) -> Result<String, Box<dyn std::error::Error>> {
    let config = apply_ask_overrides(load_config(&args.config)?, args);
    config.validate()?;
    crate::logging::init_tracing(&config.logging)?;

    let store = Arc::new(MemoryStore::load(&args.kb)?);
    tracing::debug!(
        kb = %args.kb.display(),
        tenants = store.tenant_count(),
        "Loaded knowledge base"
    );

    let pipeline = build_pipeline(&config, Arc::clone(&store))?;
    let response = pipeline
        .get_response(
            &args.tenant,
            &args.question,
            args.lang.as_deref(),
            args.trace_id.as_deref(),
        )
        .await?;

    if args.json {
        Ok(output::format_response_json(&response)?)
    } else {
        Ok(output::format_response_text(&response))
    }
}
