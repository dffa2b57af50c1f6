//! Mnemosyne - Per-Tenant Knowledge Engine
//!
//! Mnemosyne turns unstructured text (uploaded documents, scraped
//! website pages, conversation exchanges) into a per-tenant, queryable
//! memory with bounded size, low duplication, and freshness guarantees,
//! and delivers ordered, thresholded segments for token-bounded prompt
//! assembly by a downstream chat subsystem.
//!
//! # Architecture
//!
//! The crate follows a hexagonal layout:
//!
//! - **Domain Layer** (`domain`): models, error taxonomy, and the
//!   `SegmentStore` / `EmbeddingProvider` ports
//! - **Service Layer** (`services`): segmentation, embedding
//!   orchestration, conflict resolution, retrieval, summarization
//! - **Infrastructure Layer** (`infrastructure`): SQLite persistence,
//!   the OpenAI-compatible embedding adapter, configuration loading
//! - **CLI Layer** (`cli`): thin operator commands
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mnemosyne::domain::models::{RetrievalConfig, SegmentType};
//! use mnemosyne::domain::ports::{InMemorySegmentStore, NullEmbeddingProvider};
//! use mnemosyne::services::{EmbeddingService, KnowledgeService, Segmenter};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(InMemorySegmentStore::new());
//!     let embedder = EmbeddingService::with_defaults(Arc::new(NullEmbeddingProvider::new(64)));
//!     let service = KnowledgeService::new(
//!         store,
//!         embedder,
//!         Segmenter::default(),
//!         RetrievalConfig::default(),
//!     );
//!
//!     let token = CancellationToken::new();
//!     service
//!         .ingest_text("acme", "Refunds are accepted within 30 days.",
//!             SegmentType::Document, Default::default(), &token)
//!         .await?;
//!     let hits = service.query("acme", "what is the refund window?", &token).await?;
//!     println!("{} relevant segments", hits.len());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{EmbeddingError, KnowledgeError, KnowledgeResult};
pub use domain::models::{
    ChunkOutcome, IngestReport, KnowledgeConfig, KnowledgeSegment, ScoredSegment, SegmentType,
    TenantKnowledgeSummary,
};
pub use domain::ports::{EmbeddingProvider, SegmentStore};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{EmbeddingService, KnowledgeService, RetrievalEngine, Segmenter};
