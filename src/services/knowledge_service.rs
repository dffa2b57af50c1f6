//! Knowledge service facade.
//!
//! Wires segmenter, embedding service, conflict resolver, retrieval
//! engine, and summarizer behind the external entry points: ingest,
//! query, summary, delete. Explicitly constructed and dependency
//! injected; there is no ambient singleton.
//!
//! Ingestion for a single tenant is serialized through a per-tenant
//! advisory mutex so two concurrent writers cannot both conclude "no
//! collision" for what would, combined, be a duplicate pair. Different
//! tenants proceed fully in parallel. Reads take no lock and may miss an
//! in-flight write; that staleness is acceptable.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::domain::errors::{KnowledgeError, KnowledgeResult};
use crate::domain::models::{
    ChunkOutcome, IngestReport, KnowledgeSegment, RetrievalConfig, ScoredSegment, SegmentType,
    TenantKnowledgeSummary,
};
use crate::domain::ports::embedding::EmbeddingInput;
use crate::domain::ports::segment_store::SegmentStore;
use crate::services::conflict::{ConflictResolver, Resolution};
use crate::services::embedding_service::EmbeddingService;
use crate::services::retrieval::RetrievalEngine;
use crate::services::segmenter::Segmenter;
use crate::services::summarizer::KnowledgeSummarizer;

type Metadata = HashMap<String, serde_json::Value>;

/// Top-level knowledge engine service.
pub struct KnowledgeService {
    store: Arc<dyn SegmentStore>,
    embedder: EmbeddingService,
    segmenter: Segmenter,
    resolver: ConflictResolver,
    retrieval: RetrievalEngine,
    summarizer: KnowledgeSummarizer,
    config: RetrievalConfig,
    tenant_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl KnowledgeService {
    pub fn new(
        store: Arc<dyn SegmentStore>,
        embedder: EmbeddingService,
        segmenter: Segmenter,
        config: RetrievalConfig,
    ) -> Self {
        let resolver = ConflictResolver::new(config.conflict_threshold);
        let retrieval = RetrievalEngine::new(store.clone());
        let summarizer = KnowledgeSummarizer::new(store.clone());
        Self {
            store,
            embedder,
            segmenter,
            resolver,
            retrieval,
            summarizer,
            config,
            tenant_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Ingest raw text: segment, embed, conflict-check, store.
    ///
    /// Chunk-level failures (dimension mismatch, lost conflicts) land in
    /// the report rather than aborting the batch. Embedding failures
    /// abort the remainder, but chunks already stored stand; re-ingesting
    /// the same text resumes idempotently because unchanged chunks
    /// resolve as self-duplicates.
    #[instrument(skip(self, text, metadata, token), fields(tenant = %tenant_id, %segment_type))]
    pub async fn ingest_text(
        &self,
        tenant_id: &str,
        text: &str,
        segment_type: SegmentType,
        metadata: Metadata,
        token: &CancellationToken,
    ) -> KnowledgeResult<IngestReport> {
        if tenant_id.is_empty() {
            return Err(KnowledgeError::ValidationFailed(
                "tenant_id cannot be empty".to_string(),
            ));
        }

        let chunks = self.segmenter.segment(text);
        if chunks.is_empty() {
            // Nothing to ingest is a no-op, not a fault
            return Ok(IngestReport::default());
        }

        let mut report = IngestReport::default();

        // Embed and insert per provider-sized batch: a provider failure
        // partway through leaves earlier batches durably stored, and
        // re-ingesting the document later resumes idempotently.
        let batch_size = self.embedder.max_batch_size();
        let mut chunk_index = 0usize;

        for batch in chunks.chunks(batch_size) {
            let inputs: Vec<EmbeddingInput> = batch
                .iter()
                .enumerate()
                .map(|(i, chunk)| EmbeddingInput::new((chunk_index + i).to_string(), chunk.clone()))
                .collect();
            let outputs = self.embedder.embed_many(&inputs, token).await?;

            // Conflict-check and insert under the tenant's critical section.
            let lock = self.tenant_lock(tenant_id);
            let _guard = lock.lock().await;

            for (chunk, output) in batch.iter().zip(outputs) {
                if token.is_cancelled() {
                    return Err(KnowledgeError::Cancelled);
                }

                let expected = self.embedder.dimension();
                if output.vector.len() != expected {
                    report.outcomes.push(ChunkOutcome::Skipped {
                        reason: format!(
                            "dimension mismatch: expected {expected}, got {}",
                            output.vector.len()
                        ),
                    });
                    chunk_index += 1;
                    continue;
                }

                let candidate =
                    KnowledgeSegment::new(tenant_id, chunk.clone(), segment_type, output.vector)
                        .with_metadata(metadata.clone())
                        .with_meta("chunk_index", serde_json::json!(chunk_index));

                match self.resolve_and_store(tenant_id, candidate).await {
                    Ok(outcome) => {
                        if let ChunkOutcome::Stored { id } | ChunkOutcome::Superseded { id, .. } =
                            outcome
                        {
                            if let Some(seg) = self.store.get(tenant_id, id).await? {
                                report.stored.push(seg);
                            }
                        }
                        report.outcomes.push(outcome);
                    }
                    Err(KnowledgeError::DimensionMismatch { expected, actual }) => {
                        // Fatal for this chunk only
                        report.outcomes.push(ChunkOutcome::Skipped {
                            reason: format!(
                                "dimension mismatch: expected {expected}, got {actual}"
                            ),
                        });
                    }
                    Err(err) => return Err(err),
                }
                chunk_index += 1;
            }
        }

        info!(
            stored = report.stored_count(),
            skipped = report.skipped_count(),
            chunks = chunks.len(),
            "ingestion complete"
        );
        Ok(report)
    }

    /// Ingest one conversation exchange as a single `Conversation`
    /// segment.
    pub async fn ingest_conversation(
        &self,
        tenant_id: &str,
        user_message: &str,
        assistant_message: &str,
        metadata: Metadata,
        token: &CancellationToken,
    ) -> KnowledgeResult<IngestReport> {
        let user = user_message.trim();
        let assistant = assistant_message.trim();
        if user.is_empty() && assistant.is_empty() {
            return Ok(IngestReport::default());
        }
        let exchange = format!("Customer: {user}\nAssistant: {assistant}");
        self.ingest_text(
            tenant_id,
            &exchange,
            SegmentType::Conversation,
            metadata,
            token,
        )
        .await
    }

    /// Retrieve the segments most relevant to a query text.
    ///
    /// An empty result means "no relevant knowledge", never an error.
    #[instrument(skip(self, query_text, token), fields(tenant = %tenant_id))]
    pub async fn query(
        &self,
        tenant_id: &str,
        query_text: &str,
        token: &CancellationToken,
    ) -> KnowledgeResult<Vec<ScoredSegment>> {
        if query_text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let query_vector = self.embedder.embed_single(query_text, token).await?;
        self.retrieval
            .retrieve(
                tenant_id,
                &query_vector,
                self.config.retrieval_threshold,
                self.config.top_k,
            )
            .await
    }

    /// Operator-facing summary of a tenant's stored knowledge.
    pub async fn get_summary(&self, tenant_id: &str) -> KnowledgeResult<TenantKnowledgeSummary> {
        self.summarizer.summarize(tenant_id).await
    }

    /// Tenant-initiated hard delete of one segment. Returns false if the
    /// segment was absent.
    pub async fn delete_memory(&self, tenant_id: &str, segment_id: uuid::Uuid) -> KnowledgeResult<bool> {
        let deleted = self.store.delete(tenant_id, segment_id).await?;
        if deleted {
            info!(tenant = tenant_id, segment = %segment_id, "segment deleted");
        }
        Ok(deleted)
    }

    /// Apply the conflict resolver's decision for one candidate.
    ///
    /// Insert-then-mark ordering keeps `superseded_by` always pointing
    /// at a durably stored row. A `ConflictState` from `mark_superseded`
    /// means another writer won a race (possible when the store is
    /// shared across processes); the check is retried once against the
    /// now-current state before giving up.
    async fn resolve_and_store(
        &self,
        tenant_id: &str,
        candidate: KnowledgeSegment,
    ) -> KnowledgeResult<ChunkOutcome> {
        let active = self.store.find_active(tenant_id).await?;
        match self.resolver.resolve(&candidate, &active)? {
            Resolution::Insert => {
                let stored = self.store.insert(candidate).await?;
                Ok(ChunkOutcome::Stored { id: stored.id })
            }
            Resolution::DropCandidate { kept_id } => Ok(ChunkOutcome::Redundant { kept: kept_id }),
            Resolution::Supersede { existing_id } => {
                let stored = self.store.insert(candidate).await?;
                match self
                    .store
                    .mark_superseded(tenant_id, existing_id, stored.id)
                    .await
                {
                    Ok(()) => Ok(ChunkOutcome::Superseded {
                        id: stored.id,
                        replaced: existing_id,
                    }),
                    Err(KnowledgeError::ConflictState { .. }) => {
                        warn!(
                            tenant = tenant_id,
                            lost_to = %existing_id,
                            "supersession race lost, re-checking against current state"
                        );
                        self.retry_after_race(tenant_id, stored).await
                    }
                    Err(err) => Err(err),
                }
            }
        }
    }

    /// One bounded re-check after a lost supersession race.
    async fn retry_after_race(
        &self,
        tenant_id: &str,
        stored: KnowledgeSegment,
    ) -> KnowledgeResult<ChunkOutcome> {
        let active: Vec<KnowledgeSegment> = self
            .store
            .find_active(tenant_id)
            .await?
            .into_iter()
            .filter(|s| s.id != stored.id)
            .collect();

        match self.resolver.resolve(&stored, &active)? {
            // The colliding row is gone or no longer conflicts
            Resolution::Insert => Ok(ChunkOutcome::Stored { id: stored.id }),
            Resolution::Supersede { existing_id } => {
                self.store
                    .mark_superseded(tenant_id, existing_id, stored.id)
                    .await?;
                Ok(ChunkOutcome::Superseded {
                    id: stored.id,
                    replaced: existing_id,
                })
            }
            Resolution::DropCandidate { kept_id } => {
                // A higher-authority row now covers this content; undo
                // our provisional insert.
                self.store.delete(tenant_id, stored.id).await?;
                Ok(ChunkOutcome::Redundant { kept: kept_id })
            }
        }
    }

    fn tenant_lock(&self, tenant_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .tenant_locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        locks
            .entry(tenant_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}
