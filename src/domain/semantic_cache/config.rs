//! Semantic cache configuration

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

use super::decision::ThresholdPolicy;

/// Configuration for the semantic cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticCacheConfig {
    /// Embedding dimension every record must have
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Cosine distance at or below which a lookup is a hit
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    /// Write a snapshot when the server shuts down
    #[serde(default = "default_true")]
    pub snapshot_on_shutdown: bool,
}

fn default_dimensions() -> usize {
    768
}

fn default_threshold() -> f32 {
    0.1
}

fn default_true() -> bool {
    true
}

impl Default for SemanticCacheConfig {
    fn default() -> Self {
        Self {
            dimensions: default_dimensions(),
            threshold: default_threshold(),
            snapshot_on_shutdown: default_true(),
        }
    }
}

impl SemanticCacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_snapshot_on_shutdown(mut self, enabled: bool) -> Self {
        self.snapshot_on_shutdown = enabled;
        self
    }

    /// The hit predicate built from the configured threshold
    pub fn policy(&self) -> Result<ThresholdPolicy, DomainError> {
        ThresholdPolicy::new(self.threshold)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.dimensions == 0 {
            return Err(DomainError::configuration("cache.dimensions must be positive"));
        }

        self.policy().map(|_| ())
    }
}
