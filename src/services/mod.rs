//! Service layer: business logic coordination above the ports.

pub mod conflict;
pub mod embedding_service;
pub mod knowledge_service;
pub mod retrieval;
pub mod segmenter;
pub mod summarizer;

pub use conflict::{ConflictResolver, Resolution};
pub use embedding_service::{EmbeddingService, RetryPolicy};
pub use knowledge_service::KnowledgeService;
pub use retrieval::{render_context, RetrievalEngine};
pub use segmenter::Segmenter;
pub use summarizer::KnowledgeSummarizer;
