//! In-memory record store implementation

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::record::{NewRecord, Record, RecordId, RecordStore};
use crate::domain::DomainError;

/// Records in insertion order with an id lookup
///
/// Shared by the in-memory and file-backed stores; the latter replays its log
/// into one of these.
#[derive(Debug, Default)]
pub(super) struct RecordTable {
    records: Vec<Record>,
    positions: HashMap<RecordId, usize>,
    bytes: usize,
}

impl RecordTable {
    pub(super) fn from_records(records: Vec<Record>) -> Result<Self, DomainError> {
        let mut table = Self::default();

        for record in records {
            if table.positions.contains_key(&record.id()) {
                return Err(DomainError::storage_io(format!(
                    "duplicate record id {}",
                    record.id()
                )));
            }
            table.push(record);
        }

        Ok(table)
    }

    /// Rough heap footprint of a record
    pub(super) fn footprint(text: &str, dimensions: usize) -> usize {
        text.len() + dimensions * std::mem::size_of::<f32>() + std::mem::size_of::<Record>()
    }

    pub(super) fn push(&mut self, record: Record) {
        self.bytes += Self::footprint(record.text(), record.vector().len());
        self.positions.insert(record.id(), self.records.len());
        self.records.push(record);
    }

    pub(super) fn get(&self, id: &RecordId) -> Option<&Record> {
        self.positions.get(id).and_then(|&i| self.records.get(i))
    }

    pub(super) fn records(&self) -> &[Record] {
        &self.records
    }

    pub(super) fn len(&self) -> usize {
        self.records.len()
    }

    pub(super) fn bytes(&self) -> usize {
        self.bytes
    }

    /// Empty the table, returning how many records it held
    pub(super) fn clear(&mut self) -> usize {
        let removed = self.records.len();
        self.records.clear();
        self.positions.clear();
        self.bytes = 0;
        removed
    }
}

/// Reject an insert that would push the table past its memory budget
pub(super) fn check_memory(
    table: &RecordTable,
    record: &NewRecord,
    limit: Option<usize>,
) -> Result<(), DomainError> {
    match limit {
        Some(limit) if table.bytes() + RecordTable::footprint(&record.text, record.vector.len()) > limit => {
            Err(DomainError::storage_io(format!(
                "memory limit of {} bytes reached with {} records",
                limit,
                table.len()
            )))
        }
        _ => Ok(()),
    }
}

/// Thread-safe in-memory record store
///
/// Useful for testing and development. Data is lost when the process terminates.
#[derive(Debug)]
pub struct InMemoryRecordStore {
    dimensions: usize,
    memory_limit: Option<usize>,
    table: RwLock<RecordTable>,
}

impl InMemoryRecordStore {
    /// Creates a new empty in-memory store
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            memory_limit: None,
            table: RwLock::new(RecordTable::default()),
        }
    }

    /// Cap the approximate memory held by records
    pub fn with_memory_limit(mut self, limit: Option<usize>) -> Self {
        self.memory_limit = limit;
        self
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, RecordTable>, DomainError> {
        self.table
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, RecordTable>, DomainError> {
        self.table
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn load(&self) -> Result<usize, DomainError> {
        Ok(self.read()?.len())
    }

    async fn insert(&self, record: NewRecord) -> Result<Record, DomainError> {
        record.validate(self.dimensions)?;

        let mut table = self.write()?;
        check_memory(&table, &record, self.memory_limit)?;

        let record = record.commit();
        table.push(record.clone());
        Ok(record)
    }

    async fn get(&self, id: &RecordId) -> Result<Option<Record>, DomainError> {
        Ok(self.read()?.get(id).cloned())
    }

    async fn export_all(&self) -> Result<Vec<Record>, DomainError> {
        Ok(self.read()?.records().to_vec())
    }

    async fn clear(&self) -> Result<usize, DomainError> {
        Ok(self.write()?.clear())
    }

    async fn count(&self) -> Result<usize, DomainError> {
        Ok(self.read()?.len())
    }
}
