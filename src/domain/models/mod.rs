//! Domain models.

pub mod config;
pub mod segment;

pub use config::{
    DatabaseConfig, EmbeddingConfig, KnowledgeConfig, LoggingConfig, RetrievalConfig,
    SegmenterConfig,
};
pub use segment::{
    cosine_similarity, ChunkOutcome, IngestReport, KnowledgeSegment, ScoredSegment, SegmentType,
    TenantKnowledgeSummary,
};
