//! Retrieval engine.
//!
//! Brute-force cosine scan over a tenant's active segments. O(n) per
//! query is fine at the expected per-tenant scale (hundreds to low
//! thousands of segments); anything smarter can slot in behind the same
//! contract because all similarity math lives above the store.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::errors::KnowledgeResult;
use crate::domain::models::ScoredSegment;
use crate::domain::ports::segment_store::SegmentStore;

/// Read-only retrieval over a [`SegmentStore`].
pub struct RetrievalEngine {
    store: Arc<dyn SegmentStore>,
}

impl RetrievalEngine {
    pub fn new(store: Arc<dyn SegmentStore>) -> Self {
        Self { store }
    }

    /// Return up to `top_k` active segments with cosine similarity to
    /// `query_vector` at or above `threshold`, descending by score.
    ///
    /// Equal scores order by `created_at` descending so newer
    /// corrections surface first. Zero matches is a valid outcome, not
    /// an error; callers must treat an empty result as "no relevant
    /// knowledge".
    pub async fn retrieve(
        &self,
        tenant_id: &str,
        query_vector: &[f32],
        threshold: f32,
        top_k: usize,
    ) -> KnowledgeResult<Vec<ScoredSegment>> {
        let active = self.store.find_active(tenant_id).await?;
        let scanned = active.len();

        let mut hits: Vec<ScoredSegment> = Vec::new();
        for segment in active {
            let Some(score) = segment.cosine_similarity(query_vector) else {
                // Mismatched rows were rejected at write time; seeing one
                // here means the configured dimension drifted. Skip it.
                warn!(
                    tenant = tenant_id,
                    segment = %segment.id,
                    stored_dim = segment.embedding.len(),
                    query_dim = query_vector.len(),
                    "skipping segment with incompatible embedding"
                );
                continue;
            };
            if score >= threshold {
                hits.push(ScoredSegment { segment, score });
            }
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.segment.created_at.cmp(&a.segment.created_at))
        });
        hits.truncate(top_k);

        debug!(
            tenant = tenant_id,
            scanned,
            hits = hits.len(),
            threshold,
            top_k,
            "retrieval complete"
        );
        Ok(hits)
    }
}

/// Render retrieval results into a prompt section under a character
/// budget, most-relevant-first. This documents the Context Assembler's
/// consumer contract; prompt assembly itself lives with the chat
/// subsystem.
pub fn render_context(results: &[ScoredSegment], char_budget: usize) -> String {
    let mut out = String::new();
    for hit in results {
        let text = hit.segment.text.as_str();
        let needed = text.chars().count() + if out.is_empty() { 0 } else { 1 };
        if out.chars().count() + needed > char_budget {
            break;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(text);
    }
    out
}
