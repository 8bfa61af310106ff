//! Embedding provider implementations

mod factory;
mod failover;
pub mod http_client;
mod ollama;
mod openai;

pub use factory::{
    EmbeddingBackendConfig, EmbeddingBackendKind, EmbeddingConfig, EmbeddingProviderFactory,
};
pub use failover::{should_failover, FailoverEmbeddingProvider};
pub use http_client::{HttpClient, HttpClientTrait};
pub use ollama::OllamaEmbeddingProvider;
pub use openai::OpenAiEmbeddingProvider;
