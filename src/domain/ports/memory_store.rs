//! In-memory segment store.
//!
//! Backs unit tests and embedded/ephemeral deployments. Implements the
//! same contract as the SQLite store, including supersession race
//! detection, so services can be exercised without a database.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::{KnowledgeError, KnowledgeResult};
use crate::domain::models::{KnowledgeSegment, SegmentType};
use crate::domain::ports::segment_store::SegmentStore;

/// Segment store backed by a process-local map, keyed by tenant.
#[derive(Default)]
pub struct InMemorySegmentStore {
    tenants: RwLock<HashMap<String, Vec<KnowledgeSegment>>>,
}

impl InMemorySegmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SegmentStore for InMemorySegmentStore {
    async fn insert(&self, segment: KnowledgeSegment) -> KnowledgeResult<KnowledgeSegment> {
        segment
            .validate()
            .map_err(KnowledgeError::ValidationFailed)?;
        let mut tenants = self.tenants.write().await;
        tenants
            .entry(segment.tenant_id.clone())
            .or_default()
            .push(segment.clone());
        Ok(segment)
    }

    async fn get(
        &self,
        tenant_id: &str,
        segment_id: Uuid,
    ) -> KnowledgeResult<Option<KnowledgeSegment>> {
        let tenants = self.tenants.read().await;
        Ok(tenants
            .get(tenant_id)
            .and_then(|segs| segs.iter().find(|s| s.id == segment_id).cloned()))
    }

    async fn find_active(&self, tenant_id: &str) -> KnowledgeResult<Vec<KnowledgeSegment>> {
        let tenants = self.tenants.read().await;
        Ok(tenants
            .get(tenant_id)
            .map(|segs| segs.iter().filter(|s| s.is_active()).cloned().collect())
            .unwrap_or_default())
    }

    async fn count_active(&self, tenant_id: &str) -> KnowledgeResult<Vec<(SegmentType, usize)>> {
        let active = self.find_active(tenant_id).await?;
        let mut counts: HashMap<SegmentType, usize> = HashMap::new();
        for seg in &active {
            *counts.entry(seg.segment_type).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }

    async fn mark_superseded(
        &self,
        tenant_id: &str,
        old_id: Uuid,
        new_id: Uuid,
    ) -> KnowledgeResult<()> {
        let mut tenants = self.tenants.write().await;
        let segs = tenants
            .get_mut(tenant_id)
            .ok_or(KnowledgeError::SegmentNotFound(old_id))?;
        let old = segs
            .iter_mut()
            .find(|s| s.id == old_id)
            .ok_or(KnowledgeError::SegmentNotFound(old_id))?;
        match old.superseded_by {
            None => {
                old.superseded_by = Some(new_id);
                Ok(())
            }
            Some(existing) if existing == new_id => Ok(()),
            Some(existing) => Err(KnowledgeError::ConflictState {
                segment: old_id,
                superseded_by: existing,
            }),
        }
    }

    async fn delete(&self, tenant_id: &str, segment_id: Uuid) -> KnowledgeResult<bool> {
        let mut tenants = self.tenants.write().await;
        let Some(segs) = tenants.get_mut(tenant_id) else {
            return Ok(false);
        };
        let before = segs.len();
        segs.retain(|s| s.id != segment_id);
        Ok(segs.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::SegmentType;

    fn seg(tenant: &str, text: &str) -> KnowledgeSegment {
        KnowledgeSegment::new(tenant, text, SegmentType::Document, vec![0.5, 0.5])
    }

    #[tokio::test]
    async fn test_insert_and_find_active() {
        let store = InMemorySegmentStore::new();
        let stored = store.insert(seg("acme", "hours: 9-5")).await.unwrap();

        let active = store.find_active("acme").await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, stored.id);

        // Other tenants see nothing
        assert!(store.find_active("globex").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid_segment() {
        let store = InMemorySegmentStore::new();
        let bad = KnowledgeSegment::new("acme", "  ", SegmentType::Document, vec![0.5]);
        assert!(matches!(
            store.insert(bad).await,
            Err(KnowledgeError::ValidationFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_mark_superseded_excludes_from_active() {
        let store = InMemorySegmentStore::new();
        let old = store.insert(seg("acme", "hours: 9-5")).await.unwrap();
        let new = store.insert(seg("acme", "hours: 8-6")).await.unwrap();

        store
            .mark_superseded("acme", old.id, new.id)
            .await
            .unwrap();

        let active = store.find_active("acme").await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, new.id);

        // Superseded row is retained for audit
        let audited = store.get("acme", old.id).await.unwrap().unwrap();
        assert_eq!(audited.superseded_by, Some(new.id));
    }

    #[tokio::test]
    async fn test_mark_superseded_idempotent_same_winner() {
        let store = InMemorySegmentStore::new();
        let old = store.insert(seg("acme", "a")).await.unwrap();
        let new = store.insert(seg("acme", "b")).await.unwrap();

        store.mark_superseded("acme", old.id, new.id).await.unwrap();
        // Same value again is a no-op
        store.mark_superseded("acme", old.id, new.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_mark_superseded_conflict_on_different_winner() {
        let store = InMemorySegmentStore::new();
        let old = store.insert(seg("acme", "a")).await.unwrap();
        let first = store.insert(seg("acme", "b")).await.unwrap();
        let second = store.insert(seg("acme", "c")).await.unwrap();

        store.mark_superseded("acme", old.id, first.id).await.unwrap();
        let err = store
            .mark_superseded("acme", old.id, second.id)
            .await
            .unwrap_err();
        assert!(matches!(err, KnowledgeError::ConflictState { .. }));
    }

    #[tokio::test]
    async fn test_delete_is_hard_and_reports_absence() {
        let store = InMemorySegmentStore::new();
        let stored = store.insert(seg("acme", "a")).await.unwrap();

        assert!(store.delete("acme", stored.id).await.unwrap());
        assert!(store.get("acme", stored.id).await.unwrap().is_none());
        // Second delete is a no-op
        assert!(!store.delete("acme", stored.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_count_active_by_type() {
        let store = InMemorySegmentStore::new();
        store.insert(seg("acme", "a")).await.unwrap();
        store.insert(seg("acme", "b")).await.unwrap();
        store
            .insert(KnowledgeSegment::new(
                "acme",
                "note",
                SegmentType::Manual,
                vec![0.1, 0.2],
            ))
            .await
            .unwrap();

        let counts: HashMap<_, _> = store.count_active("acme").await.unwrap().into_iter().collect();
        assert_eq!(counts[&SegmentType::Document], 2);
        assert_eq!(counts[&SegmentType::Manual], 1);
    }
}
