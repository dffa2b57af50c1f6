//! SQLite implementation of the segment store.
//!
//! One row per segment; the embedding is stored as a JSON float array,
//! metadata as a JSON object, timestamps as RFC 3339 text. Runtime-bound
//! queries keep the crate buildable without a live database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::errors::{KnowledgeError, KnowledgeResult};
use crate::domain::models::{KnowledgeSegment, SegmentType};
use crate::domain::ports::segment_store::SegmentStore;

/// Segment store backed by SQLite.
pub struct SqliteSegmentStore {
    pool: SqlitePool,
}

impl SqliteSegmentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_segment(row: &sqlx::sqlite::SqliteRow) -> KnowledgeResult<KnowledgeSegment> {
        let id: String = row.try_get("id")?;
        let tenant_id: String = row.try_get("tenant_id")?;
        let text: String = row.try_get("text")?;
        let segment_type: String = row.try_get("segment_type")?;
        let embedding_json: String = row.try_get("embedding")?;
        let metadata_json: Option<String> = row.try_get("metadata")?;
        let created_at: String = row.try_get("created_at")?;
        let superseded_by: Option<String> = row.try_get("superseded_by")?;

        let id = Uuid::parse_str(&id)
            .map_err(|e| KnowledgeError::Serialization(format!("bad segment id: {e}")))?;
        let segment_type = SegmentType::from_str(&segment_type).ok_or_else(|| {
            KnowledgeError::Serialization(format!("unknown segment_type: {segment_type}"))
        })?;
        let embedding: Vec<f32> = serde_json::from_str(&embedding_json)?;
        let metadata = match metadata_json {
            Some(json) => serde_json::from_str(&json)?,
            None => Default::default(),
        };
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| KnowledgeError::Serialization(format!("bad created_at: {e}")))?
            .with_timezone(&Utc);
        let superseded_by = superseded_by
            .map(|s| {
                Uuid::parse_str(&s).map_err(|e| {
                    KnowledgeError::Serialization(format!("bad superseded_by: {e}"))
                })
            })
            .transpose()?;

        Ok(KnowledgeSegment {
            id,
            tenant_id,
            text,
            segment_type,
            embedding,
            metadata,
            created_at,
            superseded_by,
        })
    }
}

#[async_trait]
impl SegmentStore for SqliteSegmentStore {
    async fn insert(&self, segment: KnowledgeSegment) -> KnowledgeResult<KnowledgeSegment> {
        segment
            .validate()
            .map_err(KnowledgeError::ValidationFailed)?;

        let embedding_json = serde_json::to_string(&segment.embedding)?;
        let metadata_json = serde_json::to_string(&segment.metadata)?;

        sqlx::query(
            r#"
            INSERT INTO knowledge_segments (
                id, tenant_id, text, segment_type, embedding,
                metadata, created_at, superseded_by
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(segment.id.to_string())
        .bind(&segment.tenant_id)
        .bind(&segment.text)
        .bind(segment.segment_type.as_str())
        .bind(embedding_json)
        .bind(metadata_json)
        .bind(segment.created_at.to_rfc3339())
        .bind(segment.superseded_by.map(|u| u.to_string()))
        .execute(&self.pool)
        .await?;

        Ok(segment)
    }

    async fn get(
        &self,
        tenant_id: &str,
        segment_id: Uuid,
    ) -> KnowledgeResult<Option<KnowledgeSegment>> {
        let row = sqlx::query(
            r#"
            SELECT id, tenant_id, text, segment_type, embedding,
                   metadata, created_at, superseded_by
            FROM knowledge_segments
            WHERE tenant_id = ? AND id = ?
            "#,
        )
        .bind(tenant_id)
        .bind(segment_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_segment).transpose()
    }

    async fn find_active(&self, tenant_id: &str) -> KnowledgeResult<Vec<KnowledgeSegment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tenant_id, text, segment_type, embedding,
                   metadata, created_at, superseded_by
            FROM knowledge_segments
            WHERE tenant_id = ? AND superseded_by IS NULL
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_segment).collect()
    }

    async fn count_active(&self, tenant_id: &str) -> KnowledgeResult<Vec<(SegmentType, usize)>> {
        let rows = sqlx::query(
            r#"
            SELECT segment_type, COUNT(*) AS n
            FROM knowledge_segments
            WHERE tenant_id = ? AND superseded_by IS NULL
            GROUP BY segment_type
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = Vec::with_capacity(rows.len());
        for row in rows {
            let ty: String = row.try_get("segment_type")?;
            let n: i64 = row.try_get("n")?;
            let ty = SegmentType::from_str(&ty).ok_or_else(|| {
                KnowledgeError::Serialization(format!("unknown segment_type: {ty}"))
            })?;
            counts.push((ty, n as usize));
        }
        Ok(counts)
    }

    async fn mark_superseded(
        &self,
        tenant_id: &str,
        old_id: Uuid,
        new_id: Uuid,
    ) -> KnowledgeResult<()> {
        // Single conditional UPDATE keeps check-and-set atomic under
        // concurrent writers.
        let result = sqlx::query(
            r#"
            UPDATE knowledge_segments
            SET superseded_by = ?
            WHERE tenant_id = ? AND id = ?
              AND (superseded_by IS NULL OR superseded_by = ?)
            "#,
        )
        .bind(new_id.to_string())
        .bind(tenant_id)
        .bind(old_id.to_string())
        .bind(new_id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        // Distinguish "absent" from "superseded by someone else"
        let row = sqlx::query(
            "SELECT superseded_by FROM knowledge_segments WHERE tenant_id = ? AND id = ?",
        )
        .bind(tenant_id)
        .bind(old_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            None => Err(KnowledgeError::SegmentNotFound(old_id)),
            Some(row) => {
                let winner: Option<String> = row.try_get("superseded_by")?;
                let winner = winner
                    .as_deref()
                    .map(Uuid::parse_str)
                    .transpose()
                    .map_err(|e| {
                        KnowledgeError::Serialization(format!("bad superseded_by: {e}"))
                    })?
                    .unwrap_or(new_id);
                Err(KnowledgeError::ConflictState {
                    segment: old_id,
                    superseded_by: winner,
                })
            }
        }
    }

    async fn delete(&self, tenant_id: &str, segment_id: Uuid) -> KnowledgeResult<bool> {
        let result = sqlx::query(
            "DELETE FROM knowledge_segments WHERE tenant_id = ? AND id = ?",
        )
        .bind(tenant_id)
        .bind(segment_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
