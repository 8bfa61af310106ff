use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use super::failover::FailoverEmbeddingProvider;
use super::http_client::HttpClient;
use super::{OllamaEmbeddingProvider, OpenAiEmbeddingProvider};
use crate::domain::{DomainError, EmbeddingProvider};

/// Embedding backend kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackendKind {
    Ollama,
    #[serde(alias = "open_ai")]
    Openai,
}

/// One embedding backend
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingBackendConfig {
    pub kind: EmbeddingBackendKind,
    pub base_url: String,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Requested output size, for backends that can shorten embeddings
    #[serde(default)]
    pub dimensions: Option<usize>,
}

impl Default for EmbeddingBackendConfig {
    fn default() -> Self {
        Self {
            kind: EmbeddingBackendKind::Ollama,
            base_url: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            api_key: None,
            dimensions: None,
        }
    }
}

/// Embedding configuration: a primary backend and an optional fallback
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub primary: EmbeddingBackendConfig,
    #[serde(default)]
    pub fallback: Option<EmbeddingBackendConfig>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            primary: EmbeddingBackendConfig::default(),
            fallback: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Factory for creating embedding providers
#[derive(Debug)]
pub struct EmbeddingProviderFactory;

impl EmbeddingProviderFactory {
    /// Build the failover provider described by the configuration
    pub fn create(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>, DomainError> {
        if config.timeout_ms == 0 {
            return Err(DomainError::configuration("embedding.timeout_ms must be positive"));
        }

        let primary = Self::create_backend(&config.primary, config.timeout())?;
        let mut provider = FailoverEmbeddingProvider::new(primary, config.timeout());

        if let Some(fallback) = &config.fallback {
            provider = provider.with_fallback(Self::create_backend(fallback, config.timeout())?);
        }

        Ok(Arc::new(provider))
    }

    /// Create a single backend
    pub fn create_backend(
        config: &EmbeddingBackendConfig,
        timeout: Duration,
    ) -> Result<Arc<dyn EmbeddingProvider>, DomainError> {
        if config.model.trim().is_empty() {
            return Err(DomainError::configuration("embedding model must not be empty"));
        }

        let http_client = HttpClient::with_timeout(timeout)?;

        match config.kind {
            EmbeddingBackendKind::Ollama => {
                let provider = OllamaEmbeddingProvider::with_base_url(http_client, &config.base_url)
                    .with_model(&config.model);
                Ok(Arc::new(provider))
            }

            EmbeddingBackendKind::Openai => {
                let api_key = config.api_key.as_deref().ok_or_else(|| {
                    DomainError::configuration("OpenAI embedding backend requires api_key")
                })?;

                let provider =
                    OpenAiEmbeddingProvider::with_base_url(http_client, api_key, &config.base_url)
                        .with_model(&config.model)
                        .with_output_dimensions(config.dimensions);
                Ok(Arc::new(provider))
            }
        }
    }
}
