//! Infrastructure services

mod refresh_service;
mod semantic_cache_service;

pub use refresh_service::{RefreshReport, RefreshService};
pub use semantic_cache_service::{RotationGuard, SemanticCacheService};
