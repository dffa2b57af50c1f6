//! Conflict resolver.
//!
//! Prevents unbounded growth of near-duplicate knowledge and lets newer
//! information supersede older information for the same fact. Authority
//! is checked before recency: conversational chit-chat never silently
//! overrides an uploaded policy document.
//!
//! This is a pure decision function; the knowledge service performs the
//! resulting writes under the per-tenant critical section.

use tracing::debug;

use crate::domain::errors::{KnowledgeError, KnowledgeResult};
use crate::domain::models::KnowledgeSegment;
use uuid::Uuid;

/// Decision for a newly embedded candidate segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No collision above the threshold; store independently.
    Insert,
    /// Candidate wins; store it, then mark the collider superseded.
    Supersede { existing_id: Uuid },
    /// An equal-or-higher-authority segment already covers this content;
    /// drop the candidate.
    DropCandidate { kept_id: Uuid },
}

/// Stateless conflict resolver parameterized by the conflict threshold.
#[derive(Debug, Clone)]
pub struct ConflictResolver {
    threshold: f32,
}

impl ConflictResolver {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Decide what to do with `candidate` given the tenant's current
    /// active segments.
    ///
    /// Finds the most similar active segment; at or above the threshold
    /// the collision is resolved by authority first, then recency:
    /// - higher-authority candidate supersedes;
    /// - lower-authority candidate is dropped (curated knowledge wins
    ///   over noisy restatement);
    /// - equal authority breaks toward the newer segment, i.e. the
    ///   candidate supersedes. A byte-identical re-ingest lands here and
    ///   collapses to one active row.
    ///
    /// A dimension mismatch between candidate and any active segment is
    /// fatal for the candidate only (`DimensionMismatch`), never a guess.
    pub fn resolve(
        &self,
        candidate: &KnowledgeSegment,
        active: &[KnowledgeSegment],
    ) -> KnowledgeResult<Resolution> {
        let mut best: Option<(&KnowledgeSegment, f32)> = None;

        for existing in active {
            if existing.embedding.len() != candidate.embedding.len() {
                return Err(KnowledgeError::DimensionMismatch {
                    expected: existing.embedding.len(),
                    actual: candidate.embedding.len(),
                });
            }
            let Some(score) = existing.cosine_similarity(&candidate.embedding) else {
                continue;
            };
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((existing, score));
            }
        }

        let Some((collider, score)) = best else {
            return Ok(Resolution::Insert);
        };
        if score < self.threshold {
            return Ok(Resolution::Insert);
        }

        let decision = match candidate
            .segment_type
            .authority()
            .cmp(&collider.segment_type.authority())
        {
            std::cmp::Ordering::Greater => Resolution::Supersede {
                existing_id: collider.id,
            },
            std::cmp::Ordering::Less => Resolution::DropCandidate {
                kept_id: collider.id,
            },
            // Equal authority: recency wins, the candidate is newer
            std::cmp::Ordering::Equal => Resolution::Supersede {
                existing_id: collider.id,
            },
        };

        debug!(
            tenant = %candidate.tenant_id,
            candidate_type = %candidate.segment_type,
            collider_type = %collider.segment_type,
            similarity = score,
            decision = ?decision,
            "conflict resolved"
        );
        Ok(decision)
    }
}
