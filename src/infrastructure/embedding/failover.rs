//! Two-tier embedding provider: a primary backend with an optional fallback

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::embedding::{Embedding, EmbeddingProvider, EmbeddingRequest};
use crate::domain::DomainError;
use crate::infrastructure::observability::record_embedding_request;

/// The one place that decides whether the fallback gets a turn
///
/// Only an unreachable or slow primary qualifies; a rejected input would be
/// rejected by any backend.
pub fn should_failover(error: &DomainError) -> bool {
    matches!(
        error,
        DomainError::ProviderUnavailable { .. } | DomainError::Timeout { .. }
    )
}

/// Provider that bounds every backend call and fails over at most once
#[derive(Debug)]
pub struct FailoverEmbeddingProvider {
    primary: Arc<dyn EmbeddingProvider>,
    fallback: Option<Arc<dyn EmbeddingProvider>>,
    timeout: Duration,
}

impl FailoverEmbeddingProvider {
    pub fn new(primary: Arc<dyn EmbeddingProvider>, timeout: Duration) -> Self {
        Self {
            primary,
            fallback: None,
            timeout,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn EmbeddingProvider>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    async fn attempt(
        &self,
        provider: &dyn EmbeddingProvider,
        request: EmbeddingRequest,
    ) -> Result<Embedding, DomainError> {
        let name = provider.provider_name().to_string();

        let result = match tokio::time::timeout(self.timeout, provider.embed(request)).await {
            Ok(result) => result,
            Err(_) => Err(DomainError::timeout(format!("embedding via {}", name), self.timeout)),
        };

        record_embedding_request(&name, result.is_ok());
        result
    }
}

#[async_trait]
impl EmbeddingProvider for FailoverEmbeddingProvider {
    async fn embed(&self, request: EmbeddingRequest) -> Result<Embedding, DomainError> {
        request.validate()?;

        let error = match self.attempt(self.primary.as_ref(), request.clone()).await {
            Ok(embedding) => return Ok(embedding),
            Err(error) => error,
        };

        match &self.fallback {
            Some(fallback) if should_failover(&error) => {
                warn!(
                    primary = self.primary.provider_name(),
                    fallback = fallback.provider_name(),
                    error = %error,
                    "Primary embedding backend failed, trying fallback"
                );

                let request = request.with_model(fallback.default_model());
                self.attempt(fallback.as_ref(), request).await
            }
            _ => {
                debug!(error = %error, "Embedding failed without failover");
                Err(error)
            }
        }
    }

    fn provider_name(&self) -> &str {
        self.primary.provider_name()
    }

    fn default_model(&self) -> &str {
        self.primary.default_model()
    }

    fn dimensions(&self, model: &str) -> Option<usize> {
        self.primary.dimensions(model)
    }
}
