use super::memory::MemoryStore;
use crate::agent::Embedder;

/// Embed every FAQ entry that has no vector yet.
///
/// Entries are embedded one at a time; a failure is logged and the entry is
/// left for the next run. Returns how many entries were updated.
pub async fn backfill_missing_embeddings(
    store: &MemoryStore,
    embedder: &dyn Embedder,
    tenant_id: Option<&str>,
) -> usize {
    let pending = store.missing_embeddings(tenant_id);
    if pending.is_empty() {
        return 0;
    }

    let mut updated = 0;
    for entry in pending {
        match embedder.embed(&entry.text).await {
            Ok(vector) => {
                if store.set_embedding(&entry.tenant_id, entry.faq_id, vector) {
                    updated += 1;
                }
            }
            Err(e) => {
                tracing::error!(
                    tenant_id = %entry.tenant_id,
                    faq_id = entry.faq_id,
                    error = %e,
                    "Embedding backfill failed"
                );
            }
        }
    }

    tracing::info!(updated, "Embedding backfill finished");
    updated
}
