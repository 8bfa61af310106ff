//! Embedding response types

use serde::{Deserialize, Serialize};

/// An embedding vector returned by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    /// Model that produced the vector
    model: String,
    /// The embedding vector
    embedding: Vec<f32>,
}

impl Embedding {
    /// Create a new embedding
    pub fn new(model: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            model: model.into(),
            embedding,
        }
    }

    /// Get the model
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the embedding vector
    pub fn vector(&self) -> &[f32] {
        &self.embedding
    }

    /// Get the embedding dimensions
    pub fn dimensions(&self) -> usize {
        self.embedding.len()
    }

    /// Consume and return the vector
    pub fn into_vector(self) -> Vec<f32> {
        self.embedding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_accessors() {
        let embedding = Embedding::new("nomic-embed-text", vec![0.1, 0.2, 0.3]);

        assert_eq!(embedding.model(), "nomic-embed-text");
        assert_eq!(embedding.dimensions(), 3);
        assert_eq!(embedding.into_vector(), vec![0.1, 0.2, 0.3]);
    }
}
