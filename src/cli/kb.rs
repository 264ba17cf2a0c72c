//! `lumi kb` commands

use crate::agent::{AgentEmbedder, SharedAgent};
use crate::cli::{load_config, KbBackfillArgs};
use crate::store::{backfill_missing_embeddings, MemoryStore};
use std::sync::Arc;

/// Handle `lumi kb backfill` command
///
/// Embeds every entry without a vector and writes the file back when
/// anything changed.
pub async fn handle_kb_backfill(args: &KbBackfillArgs) -> Result<String, Box<dyn std::error::Error>> {
    let config = load_config(&args.config)?;
    config.validate()?;
    crate::logging::init_tracing(&config.logging)?;

    let store = MemoryStore::load(&args.kb)?;
    let pending = store.missing_embeddings(args.tenant.as_deref()).len();
    if pending == 0 {
        return Ok("✓ All FAQ entries already have embeddings".to_string());
    }

    let agent = Arc::new(SharedAgent::new(config.generation.clone()));
    agent.get().await?;
    let embedder = AgentEmbedder::new(agent, config.generation.embedding_model.clone());

    let updated = backfill_missing_embeddings(&store, &embedder, args.tenant.as_deref()).await;
    if updated > 0 {
        store.save(&args.kb)?;
    }

    Ok(format!(
        "✓ Embedded {} of {} entries in {}",
        updated,
        pending,
        args.kb.display()
    ))
}
