//! Domain layer - Core business logic and entities

pub mod embedding;
pub mod error;
pub mod index;
pub mod record;
pub mod semantic_cache;
pub mod snapshot;

pub use embedding::{Embedding, EmbeddingProvider, EmbeddingRequest};
pub use error::DomainError;
pub use index::{IndexStats, Neighbor, SimilarityIndex};
pub use record::{NewRecord, Record, RecordId, RecordMetadata, RecordStore};
pub use semantic_cache::{
    CacheDecision, CacheLookup, CacheStats, SemanticCacheConfig, ThresholdPolicy, Verdict,
};
pub use snapshot::SnapshotWriter;
