//! Application state for shared services

use std::sync::Arc;

use crate::infrastructure::services::{RefreshService, SemanticCacheService};

/// Application state shared by every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub cache: Arc<SemanticCacheService>,
    pub refresh: Arc<RefreshService>,
}

impl AppState {
    pub fn new(cache: Arc<SemanticCacheService>, refresh: Arc<RefreshService>) -> Self {
        Self { cache, refresh }
    }
}
