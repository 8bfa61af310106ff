//! Snapshot export of cache content

use std::fmt::Debug;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::record::Record;
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Durable export of every record, taken before the store is cleared
///
/// A successful `write` replaces the previous snapshot as a whole; a failed
/// one leaves it untouched.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SnapshotWriter: Send + Sync + Debug {
    /// Where the snapshot lands
    fn location(&self) -> PathBuf;

    /// Persist the records in the given order, returning how many were written
    async fn write(&self, records: &[Record]) -> Result<usize, DomainError>;
}
