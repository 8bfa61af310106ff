//! Record store trait definition

use std::fmt::Debug;

use async_trait::async_trait;

use crate::domain::DomainError;

use super::entity::{NewRecord, Record, RecordId};

#[cfg(test)]
use mockall::automock;

/// Durable, append-only table of records
///
/// Every vector has the store's fixed dimension. Implementations make an
/// inserted record durable before `insert` returns.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RecordStore: Send + Sync + Debug {
    /// Vector dimension fixed when the store was created
    fn dimensions(&self) -> usize;

    /// Rebuild in-memory state from durable storage, returning the record count
    async fn load(&self) -> Result<usize, DomainError>;

    /// Validate, stamp and persist a record
    async fn insert(&self, record: NewRecord) -> Result<Record, DomainError>;

    /// Look up a single record
    async fn get(&self, id: &RecordId) -> Result<Option<Record>, DomainError>;

    /// All records in insertion order
    async fn export_all(&self) -> Result<Vec<Record>, DomainError>;

    /// Remove every record atomically, returning how many were removed
    async fn clear(&self) -> Result<usize, DomainError>;

    /// Number of stored records
    async fn count(&self) -> Result<usize, DomainError>;
}
