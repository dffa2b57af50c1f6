//! Knowledge segment domain model.
//!
//! A segment is the atomic unit of stored knowledge: a bounded chunk of
//! text, its embedding vector, and provenance. All segments belong to
//! exactly one tenant; cross-tenant access never happens in this layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Provenance of a knowledge segment.
///
/// Provenance doubles as an authority ranking when two near-duplicate
/// segments collide: curated sources (documents, scraped website pages)
/// outrank mutable fact sources (conversation exchanges, operator notes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentType {
    /// Uploaded document chunk
    Document,
    /// Conversation exchange (user + assistant turn)
    Conversation,
    /// Scraped website content
    Website,
    /// Operator-entered fact
    Manual,
}

impl SegmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Conversation => "conversation",
            Self::Website => "website",
            Self::Manual => "manual",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "document" => Some(Self::Document),
            "conversation" => Some(Self::Conversation),
            "website" => Some(Self::Website),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }

    /// Authority rank used by the conflict resolver.
    ///
    /// Higher outranks lower. Documents and website scrapes are curated
    /// sources; conversation exchanges and manual notes are mutable fact
    /// sources that newer information may freely supersede.
    pub fn authority(&self) -> u8 {
        match self {
            Self::Document | Self::Website => 2,
            Self::Conversation | Self::Manual => 1,
        }
    }

    pub fn all() -> [SegmentType; 4] {
        [
            Self::Document,
            Self::Conversation,
            Self::Website,
            Self::Manual,
        ]
    }
}

impl std::fmt::Display for SegmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored knowledge segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeSegment {
    /// Unique identifier, assigned on creation, immutable.
    pub id: Uuid,
    /// Owning tenant; never empty.
    pub tenant_id: String,
    /// Literal chunk content, trimmed, non-empty.
    pub text: String,
    /// Provenance tag, set at creation, never mutated.
    pub segment_type: SegmentType,
    /// Fixed-dimension embedding vector.
    pub embedding: Vec<f32>,
    /// Open string-keyed metadata (source file, chunk index, uploader).
    /// Additive only; never used for identity.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// When created, immutable.
    pub created_at: DateTime<Utc>,
    /// Set when a newer segment replaces this one. A superseded segment
    /// is excluded from retrieval but retained for audit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<Uuid>,
}

impl KnowledgeSegment {
    pub fn new(
        tenant_id: impl Into<String>,
        text: impl Into<String>,
        segment_type: SegmentType,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            text: text.into(),
            segment_type,
            embedding,
            metadata: HashMap::new(),
            created_at: Utc::now(),
            superseded_by: None,
        }
    }

    /// Merge metadata entries into the segment.
    pub fn with_metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> Self {
        self.metadata.extend(metadata);
        self
    }

    /// Add a single metadata entry.
    pub fn with_meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Whether this segment still participates in retrieval.
    pub fn is_active(&self) -> bool {
        self.superseded_by.is_none()
    }

    /// Cosine similarity between this segment's embedding and a query vector.
    ///
    /// Returns None when dimensions differ or either vector is zero-length
    /// or zero-norm; callers decide whether that is an error.
    pub fn cosine_similarity(&self, query_vector: &[f32]) -> Option<f32> {
        cosine_similarity(&self.embedding, query_vector)
    }

    /// Validate invariants that hold for every stored segment.
    pub fn validate(&self) -> Result<(), String> {
        if self.tenant_id.is_empty() {
            return Err("Segment tenant_id cannot be empty".to_string());
        }
        if self.text.trim().is_empty() {
            return Err("Segment text cannot be empty".to_string());
        }
        if self.embedding.is_empty() {
            return Err("Segment embedding cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Cosine similarity between two vectors.
///
/// Returns None when dimensions differ or either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some(dot / (norm_a * norm_b))
}

/// A segment paired with its similarity score from retrieval.
#[derive(Debug, Clone)]
pub struct ScoredSegment {
    pub segment: KnowledgeSegment,
    /// Cosine similarity to the query vector.
    pub score: f32,
}

/// Derived per-tenant aggregation over active segments. Never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantKnowledgeSummary {
    pub tenant_id: String,
    /// Active (non-superseded) segment count.
    pub total_segments: usize,
    /// Active segment count per provenance type.
    pub counts_by_type: HashMap<String, usize>,
    /// Deterministic human-readable digest.
    pub digest: String,
    /// Structured facts prepared for an external text-generation step.
    pub digest_facts: Vec<String>,
}

/// Outcome for one chunk of an ingestion batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// Stored as a new independent segment.
    Stored { id: Uuid },
    /// Stored, superseding an older near-duplicate.
    Superseded { id: Uuid, replaced: Uuid },
    /// Dropped: a higher-authority segment already covers this content.
    Redundant { kept: Uuid },
    /// Skipped with a reason (e.g., dimension mismatch).
    Skipped { reason: String },
}

/// Partial-success summary of a multi-chunk ingestion.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// Per-chunk outcomes in segmentation order.
    pub outcomes: Vec<ChunkOutcome>,
    /// Segments stored by this call (new or superseding).
    pub stored: Vec<KnowledgeSegment>,
}

impl IngestReport {
    pub fn stored_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ChunkOutcome::Stored { .. } | ChunkOutcome::Superseded { .. }))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ChunkOutcome::Redundant { .. } | ChunkOutcome::Skipped { .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_type_roundtrip() {
        for ty in SegmentType::all() {
            assert_eq!(SegmentType::from_str(ty.as_str()), Some(ty));
        }
        assert_eq!(SegmentType::from_str("unknown"), None);
    }

    #[test]
    fn test_authority_ranking() {
        assert!(SegmentType::Document.authority() > SegmentType::Conversation.authority());
        assert!(SegmentType::Website.authority() > SegmentType::Manual.authority());
        assert_eq!(
            SegmentType::Conversation.authority(),
            SegmentType::Manual.authority()
        );
    }

    #[test]
    fn test_new_segment_is_active() {
        let seg = KnowledgeSegment::new("acme", "opening hours 9-5", SegmentType::Document, vec![0.1]);
        assert!(seg.is_active());
        assert!(seg.superseded_by.is_none());
        assert!(seg.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_empty_fields() {
        let seg = KnowledgeSegment::new("", "text", SegmentType::Manual, vec![0.1]);
        assert!(seg.validate().is_err());

        let seg = KnowledgeSegment::new("acme", "   ", SegmentType::Manual, vec![0.1]);
        assert!(seg.validate().is_err());

        let seg = KnowledgeSegment::new("acme", "text", SegmentType::Manual, vec![]);
        assert!(seg.validate().is_err());
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let sim = cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0, 0.0]).unwrap();
        assert!((sim - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let sim = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!(sim.abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_dimension_mismatch() {
        assert!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]).is_none());
    }

    #[test]
    fn test_cosine_similarity_zero_norm() {
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).is_none());
    }

    #[test]
    fn test_metadata_is_additive() {
        let seg = KnowledgeSegment::new("acme", "text", SegmentType::Document, vec![0.1])
            .with_meta("source_file", serde_json::json!("faq.md"))
            .with_meta("chunk_index", serde_json::json!(3));
        assert_eq!(seg.metadata.len(), 2);
        assert_eq!(seg.metadata["chunk_index"], serde_json::json!(3));
    }

    #[test]
    fn test_ingest_report_counts() {
        let id = Uuid::new_v4();
        let report = IngestReport {
            outcomes: vec![
                ChunkOutcome::Stored { id },
                ChunkOutcome::Superseded { id, replaced: Uuid::new_v4() },
                ChunkOutcome::Redundant { kept: id },
                ChunkOutcome::Skipped { reason: "dimension mismatch".into() },
            ],
            stored: Vec::new(),
        };
        assert_eq!(report.stored_count(), 2);
        assert_eq!(report.skipped_count(), 2);
    }
}
