//! Node representation in the HNSW graph

use crate::domain::record::RecordId;

/// A node in the HNSW graph
///
/// Layer 0 holds every node; a node with `max_layer() == n` also takes part
/// in layers `1..=n`.
#[derive(Debug, Clone)]
pub struct Node {
    /// Record this node indexes
    pub record_id: RecordId,

    /// Unit-length copy of the record vector
    pub vector: Vec<f32>,

    /// Neighbor node indices, `layers[0]` being the base layer
    pub layers: Vec<Vec<usize>>,
}

impl Node {
    pub fn new(record_id: RecordId, vector: Vec<f32>, max_layer: usize) -> Self {
        Self {
            record_id,
            vector,
            layers: vec![Vec::new(); max_layer + 1],
        }
    }

    pub fn max_layer(&self) -> usize {
        self.layers.len().saturating_sub(1)
    }

    pub fn neighbors(&self, layer: usize) -> &[usize] {
        self.layers.get(layer).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Add an edge, ignoring duplicates and layers this node is not on
    pub fn add_neighbor(&mut self, layer: usize, neighbor: usize) {
        if let Some(neighbors) = self.layers.get_mut(layer) {
            if !neighbors.contains(&neighbor) {
                neighbors.push(neighbor);
            }
        }
    }

    pub fn set_neighbors(&mut self, layer: usize, neighbors: Vec<usize>) {
        if let Some(slot) = self.layers.get_mut(layer) {
            *slot = neighbors;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_layers() {
        let node = Node::new(RecordId::generate(), vec![1.0], 3);
        assert_eq!(node.layers.len(), 4);
        assert_eq!(node.max_layer(), 3);
        assert!(node.neighbors(7).is_empty());
    }

    #[test]
    fn test_no_duplicate_neighbors() {
        let mut node = Node::new(RecordId::generate(), vec![1.0], 1);
        node.add_neighbor(0, 4);
        node.add_neighbor(0, 4);
        node.add_neighbor(1, 2);
        node.add_neighbor(5, 9);

        assert_eq!(node.neighbors(0), &[4]);
        assert_eq!(node.neighbors(1), &[2]);
    }
}
