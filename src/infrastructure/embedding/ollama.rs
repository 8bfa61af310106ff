//! Ollama embedding provider implementation

use async_trait::async_trait;
use serde::Deserialize;

use super::http_client::attribute;
use super::HttpClientTrait;
use crate::domain::embedding::{Embedding, EmbeddingProvider, EmbeddingRequest};
use crate::domain::DomainError;

const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_OLLAMA_MODEL: &str = "nomic-embed-text";

/// Known Ollama embedding models and their dimensions
const EMBEDDING_MODELS: &[(&str, usize)] = &[
    ("nomic-embed-text", 768),
    ("mxbai-embed-large", 1024),
    ("all-minilm", 384),
];

/// Local Ollama embedding provider
#[derive(Debug)]
pub struct OllamaEmbeddingProvider<C: HttpClientTrait> {
    client: C,
    base_url: String,
    model: String,
}

impl<C: HttpClientTrait> OllamaEmbeddingProvider<C> {
    /// Create a provider against the default local Ollama
    pub fn new(client: C) -> Self {
        Self::with_base_url(client, DEFAULT_OLLAMA_BASE_URL)
    }

    /// Create a provider with custom base URL
    pub fn with_base_url(client: C, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: DEFAULT_OLLAMA_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn embeddings_url(&self) -> String {
        format!("{}/api/embeddings", self.base_url)
    }

    fn build_request(&self, request: &EmbeddingRequest) -> serde_json::Value {
        serde_json::json!({
            "model": request.model(),
            "prompt": request.text(),
        })
    }

    fn parse_response(
        &self,
        model: &str,
        json: serde_json::Value,
    ) -> Result<Embedding, DomainError> {
        let response: OllamaEmbeddingResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::provider_unavailable(
                "ollama",
                format!("Failed to parse embedding response: {}", e),
            )
        })?;

        // Ollama answers an unknown model with an empty vector rather than an error
        if response.embedding.is_empty() {
            return Err(DomainError::provider_unavailable(
                "ollama",
                format!("model '{}' returned an empty embedding", model),
            ));
        }

        Ok(Embedding::new(model, response.embedding))
    }
}

#[async_trait]
impl<C: HttpClientTrait> EmbeddingProvider for OllamaEmbeddingProvider<C> {
    async fn embed(&self, request: EmbeddingRequest) -> Result<Embedding, DomainError> {
        request.validate()?;

        let url = self.embeddings_url();
        let body = self.build_request(&request);

        let response = self
            .client
            .post_json(&url, vec![("Content-Type", "application/json")], &body)
            .await
            .map_err(|e| attribute(e, "ollama"))?;

        self.parse_response(request.model(), response)
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    fn dimensions(&self, model: &str) -> Option<usize> {
        EMBEDDING_MODELS
            .iter()
            .find(|(name, _)| *name == model)
            .map(|(_, dims)| *dims)
    }
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}
