//! PMP Semantic Cache
//!
//! Answers near-duplicate queries from previously seen ones:
//! - Embedding backends with timeout and single failover
//! - Durable record store with an HNSW similarity index over it
//! - Snapshot-then-clear rotation of the whole cache

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use domain::EmbeddingProvider;
use infrastructure::{
    embedding::EmbeddingProviderFactory,
    index::HnswIndex,
    services::{RefreshService, SemanticCacheService},
    snapshot::JsonlSnapshotWriter,
    storage::StorageFactory,
};
use tracing::{info, warn};

/// Create the application state from configuration
///
/// Loads the persisted records and rebuilds the similarity index over them
/// before returning.
pub async fn create_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    config.validate()?;

    let dimensions = config.cache.dimensions;
    let provider = EmbeddingProviderFactory::create(&config.embedding)?;
    if let Some(native) = provider.dimensions(provider.default_model()) {
        if native != dimensions {
            warn!(
                model = provider.default_model(),
                native,
                dimensions,
                "Embedding model dimension differs from the cache; lookups will be rejected"
            );
        }
    }

    info!(
        backend = %config.storage.backend,
        data_dir = %config.storage.data_dir.display(),
        "Opening record store"
    );
    let store = StorageFactory::create(&config.storage, dimensions).await?;
    let loaded = store.load().await?;

    let index = HnswIndex::new(dimensions, config.index.clone())?;
    let cache = Arc::new(SemanticCacheService::new(
        provider,
        store,
        Box::new(index),
        &config.cache,
    )?);
    cache.ensure_consistent().await?;

    let writer = JsonlSnapshotWriter::new(
        &config.storage.snapshot_path,
        &config.storage.temp_dir,
        config.storage.io_timeout(),
    );
    let refresh = Arc::new(
        RefreshService::new(Arc::clone(&cache), Arc::new(writer))
            .with_snapshot_on_shutdown(config.cache.snapshot_on_shutdown),
    );

    info!(
        records = loaded,
        dimensions,
        threshold = cache.policy().threshold(),
        "Semantic cache ready"
    );

    Ok(AppState::new(cache, refresh))
}
