//! Similarity index implementations
//!
//! ```text
//! Layer 2: o-------------------o          (few nodes, long hops)
//!          |                   |
//! Layer 1: o------o------o-----o
//!          |      |      |     |
//! Layer 0: o-o-o-o-o-o-o-o-o-o-o-o-o      (every node)
//! ```

mod hnsw;
mod node;
mod visited;

pub use hnsw::{HnswConfig, HnswIndex};
