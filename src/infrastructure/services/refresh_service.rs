//! Cache rotation: snapshot, then clear

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use super::SemanticCacheService;
use crate::domain::snapshot::SnapshotWriter;
use crate::domain::DomainError;
use crate::infrastructure::observability::{record_refresh, set_record_count};

/// Outcome of a completed refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    /// Records written to the snapshot
    pub exported: usize,
    /// Records removed from the store
    pub cleared: usize,
    pub snapshot_path: PathBuf,
}

/// Snapshot and refresh manager
#[derive(Debug, Clone)]
pub struct RefreshService {
    cache: Arc<SemanticCacheService>,
    writer: Arc<dyn SnapshotWriter>,
    snapshot_on_shutdown: bool,
}

impl RefreshService {
    pub fn new(cache: Arc<SemanticCacheService>, writer: Arc<dyn SnapshotWriter>) -> Self {
        Self {
            cache,
            writer,
            snapshot_on_shutdown: true,
        }
    }

    pub fn with_snapshot_on_shutdown(mut self, enabled: bool) -> Self {
        self.snapshot_on_shutdown = enabled;
        self
    }

    /// Export every record, persist the snapshot and only then clear
    ///
    /// Runs detached from the caller and with the cache held exclusively, so
    /// no request observes a half-cleared cache.
    pub async fn refresh(&self) -> Result<RefreshReport, DomainError> {
        let cache = Arc::clone(&self.cache);
        let writer = Arc::clone(&self.writer);

        let result = tokio::spawn(async move { rotate(&cache, writer.as_ref()).await })
            .await
            .map_err(|e| DomainError::internal(format!("refresh task failed: {}", e)))?;

        record_refresh(result.is_ok());

        match &result {
            Ok(report) => info!(
                exported = report.exported,
                cleared = report.cleared,
                path = %report.snapshot_path.display(),
                "Cache refreshed"
            ),
            Err(e) => error!(error = %e, "Cache refresh failed, nothing was cleared"),
        }

        result
    }

    /// Explicit shutdown routine: snapshot without clearing
    ///
    /// Returns the number of records written, or `None` when shutdown
    /// snapshots are disabled.
    pub async fn shutdown(&self) -> Result<Option<usize>, DomainError> {
        if !self.snapshot_on_shutdown {
            info!("Shutdown snapshot disabled");
            return Ok(None);
        }

        let _guard = self.cache.lock_exclusive().await;
        let records = self.cache.store().export_all().await?;
        let written = self.writer.write(&records).await?;

        info!(
            records = written,
            path = %self.writer.location().display(),
            "Shutdown snapshot written"
        );
        Ok(Some(written))
    }
}

async fn rotate(
    cache: &SemanticCacheService,
    writer: &dyn SnapshotWriter,
) -> Result<RefreshReport, DomainError> {
    let guard = cache.lock_exclusive().await;

    let records = cache.store().export_all().await?;
    let exported = writer.write(&records).await?;

    let cleared = cache.store().clear().await?;
    cache.reset_index(&guard)?;
    set_record_count(0);

    Ok(RefreshReport {
        exported,
        cleared,
        snapshot_path: writer.location(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::MockEmbeddingProvider;
    use crate::domain::record::RecordStore;
    use crate::domain::semantic_cache::SemanticCacheConfig;
    use crate::domain::snapshot::MockSnapshotWriter;
    use crate::infrastructure::index::{HnswConfig, HnswIndex};
    use crate::infrastructure::snapshot::{read_snapshot, JsonlSnapshotWriter};
    use crate::infrastructure::storage::InMemoryRecordStore;
    use std::time::Duration;
    use tempfile::TempDir;

    fn cache() -> Arc<SemanticCacheService> {
        let config = SemanticCacheConfig::new().with_dimensions(3).with_threshold(0.1);

        Arc::new(
            SemanticCacheService::new(
                Arc::new(MockEmbeddingProvider::new("mock", 3)),
                Arc::new(InMemoryRecordStore::new(3)),
                Box::new(HnswIndex::new(3, HnswConfig::default()).unwrap()),
                &config,
            )
            .unwrap(),
        )
    }

    async fn seed(cache: &SemanticCacheService) {
        cache.insert("a", vec![1.0, 0.0, 0.0], None).await.unwrap();
        cache.insert("b", vec![0.0, 1.0, 0.0], None).await.unwrap();
        cache.lookup("c", None).await.unwrap();
    }

    #[tokio::test]
    async fn test_refresh_snapshots_then_clears() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("current.jsonl");
        let cache = cache();
        seed(&cache).await;
        let before = cache.store().export_all().await.unwrap();

        let writer = JsonlSnapshotWriter::new(&path, dir.path(), Duration::from_secs(5));
        let service = RefreshService::new(Arc::clone(&cache), Arc::new(writer));
        let report = service.refresh().await.unwrap();

        assert_eq!(report.exported, 3);
        assert_eq!(report.cleared, 3);
        assert_eq!(report.snapshot_path, path);
        assert_eq!(read_snapshot(&path).await.unwrap(), before);
        assert_eq!(cache.store().count().await.unwrap(), 0);
        assert_eq!(cache.stats().await.unwrap().indexed, 0);
    }

    #[tokio::test]
    async fn test_failed_snapshot_clears_nothing() {
        let cache = cache();
        seed(&cache).await;

        let mut writer = MockSnapshotWriter::new();
        writer
            .expect_write()
            .times(1)
            .returning(|_| Err(DomainError::storage_io("disk full")));
        writer
            .expect_location()
            .return_const(PathBuf::from("snapshot.jsonl"));

        let service = RefreshService::new(Arc::clone(&cache), Arc::new(writer));
        let result = service.refresh().await;

        assert!(matches!(result, Err(DomainError::StorageIo { .. })));
        assert_eq!(cache.store().count().await.unwrap(), 3);
        assert_eq!(cache.stats().await.unwrap().indexed, 3);
    }

    #[tokio::test]
    async fn test_cache_usable_after_refresh() {
        let dir = TempDir::new().unwrap();
        let cache = cache();
        seed(&cache).await;

        let writer = JsonlSnapshotWriter::new(dir.path().join("s.jsonl"), dir.path(), Duration::from_secs(5));
        RefreshService::new(Arc::clone(&cache), Arc::new(writer))
            .refresh()
            .await
            .unwrap();

        let decision = cache.lookup("a", None).await.unwrap();
        assert!(!decision.is_hit());
        assert_eq!(cache.store().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_refresh_waits_for_in_flight_requests() {
        let dir = TempDir::new().unwrap();
        let cache = cache();
        let writer = Arc::new(JsonlSnapshotWriter::new(
            dir.path().join("s.jsonl"),
            dir.path(),
            Duration::from_secs(5),
        ));
        let service = RefreshService::new(Arc::clone(&cache), writer);

        let inserts: Vec<_> = (0..20)
            .map(|i| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move {
                    cache
                        .insert(&format!("t{}", i), vec![1.0, i as f32, 0.5], None)
                        .await
                        .unwrap();
                })
            })
            .collect();
        let report = service.refresh().await.unwrap();
        for insert in inserts {
            insert.await.unwrap();
        }

        // Every insert landed either in the snapshot or in the fresh cache
        let remaining = cache.store().count().await.unwrap();
        assert_eq!(report.exported, report.cleared);
        assert_eq!(report.exported + remaining, 20);
        assert_eq!(cache.stats().await.unwrap().indexed, remaining);
    }

    #[tokio::test]
    async fn test_shutdown_snapshots_without_clearing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("current.jsonl");
        let cache = cache();
        seed(&cache).await;

        let writer = JsonlSnapshotWriter::new(&path, dir.path(), Duration::from_secs(5));
        let service = RefreshService::new(Arc::clone(&cache), Arc::new(writer));

        assert_eq!(service.shutdown().await.unwrap(), Some(3));
        assert_eq!(read_snapshot(&path).await.unwrap().len(), 3);
        assert_eq!(cache.store().count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_shutdown_snapshot_disabled() {
        let mut writer = MockSnapshotWriter::new();
        writer.expect_write().never();

        let service = RefreshService::new(cache(), Arc::new(writer)).with_snapshot_on_shutdown(false);

        assert_eq!(service.shutdown().await.unwrap(), None);
    }
}
