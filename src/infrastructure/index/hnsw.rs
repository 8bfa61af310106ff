//! HNSW index implementation
//!
//! **Insert**: draw a random level L, greedily descend from the entry point
//! down to layer L + 1, then on every layer from min(L, top) to 0 link the
//! node to its M closest candidates. A neighbor pushed over its edge cap is
//! pruned back to its closest edges.
//!
//! **Search**: greedy descent to layer 1, then best-first expansion on
//! layer 0 bounded by `ef`.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use super::node::Node;
use super::visited::VisitedList;
use crate::domain::index::{dot_product, normalize, IndexStats, Neighbor, SimilarityIndex};
use crate::domain::record::RecordId;
use crate::domain::DomainError;

/// Hard ceiling on drawn levels
const MAX_LEVEL: usize = 16;

/// HNSW construction and search parameters
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HnswConfig {
    /// Max neighbors per node on layers above the base layer
    #[serde(default = "default_m")]
    pub m: usize,

    /// Max neighbors per node on layer 0 (defaults to 2 * m)
    #[serde(default)]
    pub max_connections_base: Option<usize>,

    /// Candidate list width while inserting
    #[serde(default = "default_ef_construction")]
    pub ef_construction: usize,

    /// Candidate list width while searching
    #[serde(default = "default_ef_search")]
    pub ef_search: usize,

    /// Seed for level assignment; random when unset
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_m() -> usize {
    16
}

fn default_ef_construction() -> usize {
    100
}

fn default_ef_search() -> usize {
    64
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            m: default_m(),
            max_connections_base: None,
            ef_construction: default_ef_construction(),
            ef_search: default_ef_search(),
            seed: None,
        }
    }
}

impl HnswConfig {
    pub fn with_m(mut self, m: usize) -> Self {
        self.m = m;
        self
    }

    pub fn with_ef_construction(mut self, ef: usize) -> Self {
        self.ef_construction = ef;
        self
    }

    pub fn with_ef_search(mut self, ef: usize) -> Self {
        self.ef_search = ef;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn base_connections(&self) -> usize {
        self.max_connections_base.unwrap_or(self.m * 2)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.m < 2 {
            return Err(DomainError::configuration("index.m must be at least 2"));
        }

        if self.base_connections() < self.m {
            return Err(DomainError::configuration(
                "index.max_connections_base must not be smaller than index.m",
            ));
        }

        if self.ef_construction == 0 || self.ef_search == 0 {
            return Err(DomainError::configuration(
                "index.ef_construction and index.ef_search must be positive",
            ));
        }

        Ok(())
    }
}

/// Frontier entry, popped closest first
#[derive(Clone, Copy)]
struct Candidate {
    index: usize,
    distance: f32,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance
    }
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so BinaryHeap behaves as a min-heap
        other
            .distance
            .partial_cmp(&self.distance)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Result entry, popped furthest first so the worst is evicted
#[derive(Clone, Copy)]
struct Found {
    index: usize,
    distance: f32,
}

impl PartialEq for Found {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance
    }
}

impl Eq for Found {}

impl Ord for Found {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .partial_cmp(&other.distance)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Found {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Hierarchical navigable small-world graph over unit vectors
pub struct HnswIndex {
    dimensions: usize,
    config: HnswConfig,
    nodes: Vec<Node>,
    id_to_index: HashMap<RecordId, usize>,
    entry_point: Option<usize>,
    max_layer: usize,
    /// 1 / ln(M)
    level_multiplier: f64,
    rng: StdRng,
}

impl fmt::Debug for HnswIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HnswIndex")
            .field("dimensions", &self.dimensions)
            .field("nodes", &self.nodes.len())
            .field("max_layer", &self.max_layer)
            .field("config", &self.config)
            .finish()
    }
}

impl HnswIndex {
    pub fn new(dimensions: usize, config: HnswConfig) -> Result<Self, DomainError> {
        if dimensions == 0 {
            return Err(DomainError::configuration("index dimensions must be positive"));
        }
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            dimensions,
            level_multiplier: 1.0 / (config.m as f64).ln(),
            config,
            nodes: Vec::new(),
            id_to_index: HashMap::new(),
            entry_point: None,
            max_layer: 0,
            rng,
        })
    }

    pub fn config(&self) -> &HnswConfig {
        &self.config
    }

    /// Draw a level from the exponential distribution
    fn random_level(&mut self) -> usize {
        let r: f64 = self.rng.gen_range(f64::MIN_POSITIVE..1.0);
        ((-r.ln() * self.level_multiplier).floor() as usize).min(MAX_LEVEL)
    }

    fn max_connections(&self, layer: usize) -> usize {
        if layer == 0 {
            self.config.base_connections()
        } else {
            self.config.m
        }
    }

    #[inline]
    fn distance(&self, query: &[f32], index: usize) -> f32 {
        (1.0 - dot_product(query, &self.nodes[index].vector)).max(0.0)
    }

    /// Walk to the closest neighbor until nothing closer is linked
    fn greedy_closest(&self, query: &[f32], start: usize, layer: usize) -> usize {
        let mut current = start;
        let mut best = self.distance(query, current);

        loop {
            let mut moved = false;

            for &neighbor in self.nodes[current].neighbors(layer) {
                let distance = self.distance(query, neighbor);
                if distance < best {
                    best = distance;
                    current = neighbor;
                    moved = true;
                }
            }

            if !moved {
                return current;
            }
        }
    }

    /// Best-first expansion on one layer keeping the `ef` closest nodes
    fn search_layer(&self, query: &[f32], entry: usize, ef: usize, layer: usize) -> Vec<(usize, f32)> {
        let mut visited = VisitedList::new(self.nodes.len());
        let mut candidates: BinaryHeap<Candidate> = BinaryHeap::with_capacity(ef);
        let mut results: BinaryHeap<Found> = BinaryHeap::with_capacity(ef + 1);

        visited.insert(entry);
        let distance = self.distance(query, entry);
        candidates.push(Candidate {
            index: entry,
            distance,
        });
        results.push(Found {
            index: entry,
            distance,
        });

        while let Some(current) = candidates.pop() {
            if let Some(worst) = results.peek() {
                if results.len() >= ef && current.distance > worst.distance {
                    break;
                }
            }

            for &neighbor in self.nodes[current.index].neighbors(layer) {
                if !visited.insert(neighbor) {
                    continue;
                }

                let distance = self.distance(query, neighbor);
                let dominated = results.len() >= ef
                    && results.peek().is_some_and(|worst| distance >= worst.distance);

                if dominated {
                    continue;
                }

                candidates.push(Candidate {
                    index: neighbor,
                    distance,
                });
                results.push(Found {
                    index: neighbor,
                    distance,
                });

                if results.len() > ef {
                    results.pop();
                }
            }
        }

        let mut found: Vec<(usize, f32)> = results
            .into_iter()
            .map(|r| (r.index, r.distance))
            .collect();
        found.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        found
    }

    /// Exhaustive distance scan
    fn scan(&self, query: &[f32]) -> Vec<(usize, f32)> {
        let mut found: Vec<(usize, f32)> = (0..self.nodes.len())
            .map(|index| (index, self.distance(query, index)))
            .collect();
        found.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        found
    }

    /// Trim a node's edges on one layer back to its closest neighbors
    fn prune(&mut self, index: usize, layer: usize) {
        let cap = self.max_connections(layer);
        let node = &self.nodes[index];

        if node.neighbors(layer).len() <= cap {
            return;
        }

        let mut scored: Vec<(usize, f32)> = node
            .neighbors(layer)
            .iter()
            .map(|&n| (n, 1.0 - dot_product(&node.vector, &self.nodes[n].vector)))
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        scored.truncate(cap);

        self.nodes[index].set_neighbors(layer, scored.into_iter().map(|(n, _)| n).collect());
    }
}

impl SimilarityIndex for HnswIndex {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn insert(&mut self, id: RecordId, vector: &[f32]) -> Result<(), DomainError> {
        self.validate(vector)?;

        if self.id_to_index.contains_key(&id) {
            return Err(DomainError::index_corruption(format!(
                "record {} is already indexed",
                id
            )));
        }

        let query = normalize(vector);
        let level = self.random_level();
        let index = self.nodes.len();

        let Some(entry_point) = self.entry_point else {
            self.nodes.push(Node::new(id, query, level));
            self.id_to_index.insert(id, index);
            self.entry_point = Some(index);
            self.max_layer = level;
            return Ok(());
        };

        // Phase 1: zoom in through the layers above the new node's level
        let mut current = entry_point;
        for layer in (level + 1..=self.max_layer).rev() {
            current = self.greedy_closest(&query, current, layer);
        }

        // Nothing links to the new node yet, so searches below cannot reach it
        self.nodes.push(Node::new(id, query.clone(), level));
        self.id_to_index.insert(id, index);

        // Phase 2: wire the node into every layer it shares with the graph
        for layer in (0..=level.min(self.max_layer)).rev() {
            let candidates = self.search_layer(&query, current, self.config.ef_construction, layer);
            let selected: Vec<usize> = candidates
                .iter()
                .take(self.config.m)
                .map(|&(n, _)| n)
                .collect();

            for &neighbor in &selected {
                self.nodes[neighbor].add_neighbor(layer, index);
                self.prune(neighbor, layer);
            }
            self.nodes[index].set_neighbors(layer, selected);

            if let Some(&(closest, _)) = candidates.first() {
                current = closest;
            }
        }

        if level > self.max_layer {
            self.max_layer = level;
            self.entry_point = Some(index);
        }

        Ok(())
    }

    fn search(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>, DomainError> {
        self.validate(vector)?;

        let Some(entry_point) = self.entry_point else {
            return Ok(Vec::new());
        };

        if k == 0 {
            return Ok(Vec::new());
        }

        let query = normalize(vector);
        let ef = self.config.ef_search.max(k);

        // A beam of width ef over at most ef nodes visits all of them anyway
        let found = if self.nodes.len() <= ef {
            self.scan(&query)
        } else {
            let mut current = entry_point;
            for layer in (1..=self.max_layer).rev() {
                current = self.greedy_closest(&query, current, layer);
            }
            self.search_layer(&query, current, ef, 0)
        };

        Ok(found
            .into_iter()
            .take(k)
            .map(|(index, distance)| Neighbor {
                id: self.nodes[index].record_id,
                distance,
            })
            .collect())
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.id_to_index.clear();
        self.entry_point = None;
        self.max_layer = 0;
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn contains(&self, id: &RecordId) -> bool {
        self.id_to_index.contains_key(id)
    }

    fn stats(&self) -> IndexStats {
        let mut layer_counts = vec![0usize; self.max_layer + 1];
        let mut edges = 0;

        for node in &self.nodes {
            for (layer, neighbors) in node.layers.iter().enumerate() {
                if let Some(count) = layer_counts.get_mut(layer) {
                    *count += 1;
                }
                edges += neighbors.len();
            }
        }

        if self.nodes.is_empty() {
            layer_counts.clear();
        }

        IndexStats {
            nodes: self.nodes.len(),
            max_layer: self.max_layer,
            edges,
            layer_counts,
        }
    }
}
