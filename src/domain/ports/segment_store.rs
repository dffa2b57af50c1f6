//! Segment store port.
//!
//! The sole owner of durable state. All similarity math happens above
//! this layer so the backing store (in-memory, SQLite, a dedicated
//! vector index) can be swapped without touching callers.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::KnowledgeResult;
use crate::domain::models::{KnowledgeSegment, SegmentType};

/// Repository trait for knowledge segment persistence.
///
/// Every operation is scoped to exactly one tenant. Segments are never
/// hard-deleted by the engine itself except through [`delete`], which
/// backs explicit tenant-initiated memory deletion.
///
/// [`delete`]: SegmentStore::delete
#[async_trait]
pub trait SegmentStore: Send + Sync {
    /// Persist a segment as an atomic single-row write.
    ///
    /// Returns the stored segment. Fails with `ValidationFailed` if the
    /// segment violates model invariants (empty tenant, text, or vector).
    async fn insert(&self, segment: KnowledgeSegment) -> KnowledgeResult<KnowledgeSegment>;

    /// Fetch one segment by ID, superseded or not. None if absent.
    async fn get(&self, tenant_id: &str, segment_id: Uuid)
        -> KnowledgeResult<Option<KnowledgeSegment>>;

    /// All non-superseded segments for a tenant, in no guaranteed order.
    async fn find_active(&self, tenant_id: &str) -> KnowledgeResult<Vec<KnowledgeSegment>>;

    /// Count of active segments per type, cheap enough for dashboards.
    async fn count_active(&self, tenant_id: &str) -> KnowledgeResult<Vec<(SegmentType, usize)>>;

    /// Mark `old_id` as superseded by `new_id`.
    ///
    /// Idempotent when `old_id` is already superseded by the same
    /// `new_id`. Fails with `ConflictState` when it is superseded by a
    /// *different* segment (a concurrent writer won the race), and with
    /// `SegmentNotFound` when `old_id` does not exist for the tenant.
    async fn mark_superseded(
        &self,
        tenant_id: &str,
        old_id: Uuid,
        new_id: Uuid,
    ) -> KnowledgeResult<()>;

    /// Hard-delete a segment. Returns false if it was absent.
    async fn delete(&self, tenant_id: &str, segment_id: Uuid) -> KnowledgeResult<bool>;
}
