//! Semantic cache domain models
//!
//! Matches queries by embedding distance rather than exact text: a query
//! whose nearest stored record lies within the threshold is a hit.

mod config;
mod decision;

pub use config::SemanticCacheConfig;
pub use decision::{CacheDecision, CacheLookup, CacheStats, ThresholdPolicy, Verdict};
