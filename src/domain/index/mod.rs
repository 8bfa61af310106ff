//! Similarity index domain - the derived, rebuildable ANN structure

mod metric;

pub use metric::{cosine_distance, dot_product, normalize, validate_vector};

use std::fmt::Debug;

use serde::Serialize;

use crate::domain::record::{Record, RecordId};
use crate::domain::DomainError;

/// A search hit: record id and its cosine distance to the query
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    pub id: RecordId,
    pub distance: f32,
}

/// Shape of the index graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Number of indexed vectors
    pub nodes: usize,
    /// Highest populated layer
    pub max_layer: usize,
    /// Directed edges across all layers
    pub edges: usize,
    /// Nodes present on each layer, base layer first
    pub layer_counts: Vec<usize>,
}

/// Approximate nearest-neighbour index over record vectors
///
/// Never authoritative: the record store is, and `rebuild` regenerates the
/// index from it. Distances are cosine distances, smaller is closer.
pub trait SimilarityIndex: Send + Sync + Debug {
    /// Dimension every vector must have
    fn dimensions(&self) -> usize;

    /// Check a vector without touching the index
    fn validate(&self, vector: &[f32]) -> Result<(), DomainError> {
        validate_vector(vector, self.dimensions())
    }

    /// Add a vector under the given record id
    fn insert(&mut self, id: RecordId, vector: &[f32]) -> Result<(), DomainError>;

    /// Up to `k` nearest entries, ascending by distance
    fn search(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>, DomainError>;

    /// Drop everything and re-insert the given records in order
    fn rebuild(&mut self, records: &[Record]) -> Result<(), DomainError> {
        self.clear();

        for record in records {
            self.insert(record.id(), record.vector())?;
        }

        Ok(())
    }

    /// Remove every entry
    fn clear(&mut self);

    /// Number of indexed entries
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, id: &RecordId) -> bool;

    fn stats(&self) -> IndexStats;
}
