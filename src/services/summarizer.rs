//! Knowledge summarizer.
//!
//! Read-only aggregation over a tenant's active segments, backing
//! operator dashboards. Safe to call frequently: no side effects, no
//! locks. The natural-language digest is delegated to an external
//! text-generation collaborator; this component only prepares the
//! structured fact list such a step would consume.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::errors::KnowledgeResult;
use crate::domain::models::{SegmentType, TenantKnowledgeSummary};
use crate::domain::ports::segment_store::SegmentStore;

/// Aggregates active segments into a [`TenantKnowledgeSummary`].
pub struct KnowledgeSummarizer {
    store: Arc<dyn SegmentStore>,
}

impl KnowledgeSummarizer {
    pub fn new(store: Arc<dyn SegmentStore>) -> Self {
        Self { store }
    }

    pub async fn summarize(&self, tenant_id: &str) -> KnowledgeResult<TenantKnowledgeSummary> {
        let active = self.store.find_active(tenant_id).await?;

        let mut counts_by_type: HashMap<String, usize> = HashMap::new();
        for segment in &active {
            *counts_by_type
                .entry(segment.segment_type.as_str().to_string())
                .or_default() += 1;
        }

        // Deterministic ordering for the digest and fact list
        let mut ordered = active.clone();
        ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let digest_facts: Vec<String> = ordered
            .iter()
            .map(|s| format!("[{}] {}", s.segment_type, s.text))
            .collect();

        let mut type_parts: Vec<String> = SegmentType::all()
            .iter()
            .filter_map(|ty| {
                counts_by_type
                    .get(ty.as_str())
                    .map(|n| format!("{n} {ty}"))
            })
            .collect();
        if type_parts.is_empty() {
            type_parts.push("no knowledge stored yet".to_string());
        }
        let digest = format!(
            "{} active segments ({})",
            active.len(),
            type_parts.join(", ")
        );

        Ok(TenantKnowledgeSummary {
            tenant_id: tenant_id.to_string(),
            total_segments: active.len(),
            counts_by_type,
            digest,
            digest_facts,
        })
    }
}
