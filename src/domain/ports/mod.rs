//! Ports (trait boundaries) between the engine and its collaborators.

pub mod embedding;
pub mod memory_store;
pub mod null_embedding;
pub mod segment_store;

pub use embedding::{EmbeddingInput, EmbeddingOutput, EmbeddingProvider};
pub use memory_store::InMemorySegmentStore;
pub use null_embedding::NullEmbeddingProvider;
pub use segment_store::SegmentStore;
