//! Embedding provider trait definition

use async_trait::async_trait;
use std::fmt::Debug;

use super::{Embedding, EmbeddingRequest};
use crate::domain::DomainError;

/// Trait for embedding backends (Ollama, OpenAI-compatible, ...)
///
/// Implementations fail with `InvalidInput` for text they refuse and with
/// `ProviderUnavailable` when the backend cannot be reached.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + Debug {
    /// Generate an embedding for the given text
    async fn embed(&self, request: EmbeddingRequest) -> Result<Embedding, DomainError>;

    /// Get the provider name
    fn provider_name(&self) -> &str;

    /// Get the default model for this provider
    fn default_model(&self) -> &str;

    /// Get the embedding dimensions for a model, when known
    fn dimensions(&self, model: &str) -> Option<usize>;
}
