//! Vector records - the durable source of truth behind the cache

mod entity;
mod repository;

pub use entity::{NewRecord, Record, RecordId, RecordMetadata};
pub use repository::RecordStore;

#[cfg(test)]
pub use repository::MockRecordStore;
