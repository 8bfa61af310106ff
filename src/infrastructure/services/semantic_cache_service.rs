//! Semantic cache orchestration
//!
//! Every lookup embeds the query, asks the index for the single nearest
//! record, classifies it against the threshold and then appends the query as
//! a new record whatever the verdict.
//!
//! Locking:
//! - `gate`: requests hold it shared, a refresh holds it exclusively
//! - `writer`: serializes store+index commits
//! - the index `RwLock` is only held inside synchronous sections
//!
//! Commits run in a spawned task that owns its gate guard, so a caller that
//! goes away mid-commit can neither leave the store and index diverged nor
//! let a refresh slip in between them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use tokio::sync::{Mutex, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock as GateLock};
use tracing::{debug, info, warn};

use crate::domain::embedding::{EmbeddingProvider, EmbeddingRequest};
use crate::domain::index::{validate_vector, Neighbor, SimilarityIndex};
use crate::domain::record::{NewRecord, Record, RecordMetadata, RecordStore};
use crate::domain::semantic_cache::{
    CacheDecision, CacheStats, SemanticCacheConfig, ThresholdPolicy, Verdict,
};
use crate::domain::DomainError;
use crate::infrastructure::observability::{record_lookup, set_record_count};

/// Exclusive hold on the cache; no request runs while it is alive
pub type RotationGuard = OwnedRwLockWriteGuard<()>;

/// Store and index, shared with in-flight commit tasks
#[derive(Debug)]
struct CacheCore {
    store: Arc<dyn RecordStore>,
    index: RwLock<Box<dyn SimilarityIndex>>,
    writer: Mutex<()>,
}

impl CacheCore {
    fn index(&self) -> Result<RwLockReadGuard<'_, Box<dyn SimilarityIndex>>, DomainError> {
        self.index
            .read()
            .map_err(|_| DomainError::index_corruption("index lock poisoned"))
    }

    fn index_mut(&self) -> Result<RwLockWriteGuard<'_, Box<dyn SimilarityIndex>>, DomainError> {
        self.index
            .write()
            .map_err(|_| DomainError::index_corruption("index lock poisoned"))
    }

    fn nearest(&self, vector: &[f32]) -> Result<Option<Neighbor>, DomainError> {
        Ok(self.index()?.search(vector, 1)?.into_iter().next())
    }

    /// Validate against the index, persist, then index
    async fn commit(&self, record: NewRecord) -> Result<Record, DomainError> {
        let _writer = self.writer.lock().await;

        record.validate(self.store.dimensions())?;
        self.index()?.validate(&record.vector)?;

        let stored = self.store.insert(record).await?;

        let indexed = self.index_mut()?.insert(stored.id(), stored.vector());
        if let Err(error) = indexed {
            warn!(id = %stored.id(), error = %error, "Index insert failed, rebuilding from store");
            self.rebuild().await?;
        }

        set_record_count(self.store.count().await?);
        Ok(stored)
    }

    /// Rebuild after a failed search
    async fn recover(&self) -> Result<usize, DomainError> {
        let _writer = self.writer.lock().await;
        self.rebuild().await
    }

    /// Regenerate the index from the store; callers hold the writer lock
    async fn rebuild(&self) -> Result<usize, DomainError> {
        let records = self.store.export_all().await?;

        self.index_mut()?.rebuild(&records).map_err(|e| {
            DomainError::index_corruption(format!("rebuild from store failed: {}", e))
        })?;

        info!(records = records.len(), "Rebuilt similarity index");
        Ok(records.len())
    }
}

/// Semantic cache service
#[derive(Debug)]
pub struct SemanticCacheService {
    provider: Arc<dyn EmbeddingProvider>,
    core: Arc<CacheCore>,
    gate: Arc<GateLock<()>>,
    policy: ThresholdPolicy,
    dimensions: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SemanticCacheService {
    /// Wire a provider, a store and an index that all agree on the dimension
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn RecordStore>,
        index: Box<dyn SimilarityIndex>,
        config: &SemanticCacheConfig,
    ) -> Result<Self, DomainError> {
        config.validate()?;

        if store.dimensions() != config.dimensions || index.dimensions() != config.dimensions {
            return Err(DomainError::configuration(format!(
                "dimension mismatch: cache {}, store {}, index {}",
                config.dimensions,
                store.dimensions(),
                index.dimensions()
            )));
        }

        Ok(Self {
            provider,
            core: Arc::new(CacheCore {
                store,
                index: RwLock::new(index),
                writer: Mutex::new(()),
            }),
            gate: Arc::new(GateLock::new(())),
            policy: config.policy()?,
            dimensions: config.dimensions,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn policy(&self) -> ThresholdPolicy {
        self.policy
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.core.store
    }

    async fn enter(&self) -> OwnedRwLockReadGuard<()> {
        Arc::clone(&self.gate).read_owned().await
    }

    /// Wait for in-flight requests and hold off new ones
    pub async fn lock_exclusive(&self) -> RotationGuard {
        Arc::clone(&self.gate).write_owned().await
    }

    /// Drop every index entry; only valid while the cache is held exclusively
    pub fn reset_index(&self, _guard: &RotationGuard) -> Result<(), DomainError> {
        self.core.index_mut()?.clear();
        Ok(())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        let request = EmbeddingRequest::new(self.provider.default_model(), text);
        let vector = self.provider.embed(request).await?.into_vector();

        validate_vector(&vector, self.dimensions)?;
        Ok(vector)
    }

    /// Commit in a detached task holding the caller's gate guard
    async fn commit(
        &self,
        record: NewRecord,
        gate: OwnedRwLockReadGuard<()>,
    ) -> Result<Record, DomainError> {
        let core = Arc::clone(&self.core);

        tokio::spawn(async move {
            let result = core.commit(record).await;
            drop(gate);
            result
        })
        .await
        .map_err(|e| DomainError::internal(format!("commit task failed: {}", e)))?
    }

    /// Embed text into a vector of the cache's dimension
    pub async fn vectorize(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        let _gate = self.enter().await;
        self.embed(text).await
    }

    /// Store a caller-supplied vector
    pub async fn insert(
        &self,
        text: &str,
        vector: Vec<f32>,
        metadata: Option<RecordMetadata>,
    ) -> Result<Record, DomainError> {
        let gate = self.enter().await;
        let record = NewRecord::new(text, vector).with_metadata(metadata);

        let stored = self.commit(record, gate).await?;
        debug!(id = %stored.id(), "Inserted record");
        Ok(stored)
    }

    /// Run the cache protocol for `text`
    pub async fn lookup(
        &self,
        text: &str,
        metadata: Option<RecordMetadata>,
    ) -> Result<CacheDecision, DomainError> {
        let started = Instant::now();
        let gate = self.enter().await;

        if let Some(metadata) = &metadata {
            metadata.validate()?;
        }

        let vector = self.embed(text).await?;
        let neighbor = match self.core.nearest(&vector) {
            Err(error) if error.requires_index_rebuild() => {
                warn!(error = %error, "Index search failed, rebuilding from store");
                self.core.recover().await?;
                self.core.nearest(&vector)?
            }
            result => result?,
        };

        let (nearest, distance) = match neighbor {
            Some(neighbor) => match self.core.store.get(&neighbor.id).await? {
                Some(record) => (Some(record), Some(neighbor.distance)),
                None => {
                    warn!(id = %neighbor.id, "Index returned a record the store does not hold");
                    (None, None)
                }
            },
            None => (None, None),
        };

        let verdict = self.policy.classify(distance);
        let diverged = neighbor.is_some() && nearest.is_none();

        let record = NewRecord::new(text, vector.clone()).with_metadata(metadata);
        let stored = self.commit(record, gate).await?;

        if diverged {
            self.ensure_consistent().await?;
        }

        match verdict {
            Verdict::Hit => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(distance = ?distance, "Semantic cache hit");
            }
            Verdict::Miss => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(distance = ?distance, "Semantic cache miss");
            }
        }
        record_lookup(verdict, started.elapsed());

        Ok(CacheDecision {
            query_text: text.to_string(),
            query_vector: vector,
            nearest,
            distance,
            verdict,
            stored: stored.id(),
        })
    }

    /// Rebuild the index if it no longer mirrors the store
    pub async fn ensure_consistent(&self) -> Result<bool, DomainError> {
        let _gate = self.enter().await;
        let _writer = self.core.writer.lock().await;

        let records = self.core.store.export_all().await?;
        let diverged = {
            let index = self.core.index()?;
            index.len() != records.len() || records.iter().any(|r| !index.contains(&r.id()))
        };

        if diverged {
            warn!(
                records = records.len(),
                "Similarity index diverged from the record store"
            );
            self.core.rebuild().await?;
        }

        set_record_count(records.len());
        Ok(diverged)
    }

    pub async fn stats(&self) -> Result<CacheStats, DomainError> {
        let _gate = self.enter().await;
        let records = self.core.store.count().await?;
        let index = self.core.index()?.stats();

        Ok(CacheStats {
            records,
            indexed: index.nodes,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            threshold: self.policy.threshold(),
            dimensions: self.dimensions,
            index,
        })
    }
}
