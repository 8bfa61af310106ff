//! Embedding request types

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Request to embed a single piece of text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// Model to use for embedding
    model: String,
    /// Text to embed
    text: String,
}

impl EmbeddingRequest {
    /// Create a new embedding request
    pub fn new(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            text: text.into(),
        }
    }

    /// Get the model
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Return a copy of this request targeting another model
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            text: self.text.clone(),
        }
    }

    /// Reject text no backend could meaningfully embed
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.text.trim().is_empty() {
            return Err(DomainError::invalid_input("text to embed must not be empty"));
        }

        Ok(())
    }
}
