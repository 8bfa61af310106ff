//! Record entity and metadata

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::DomainError;

/// Unique, never reused record identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for RecordId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Structured metadata attached to a record
///
/// Mirrors the `(file, chunk)` shape cached documents are tagged with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordMetadata {
    /// Source file the text came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Chunk number within the source file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk: Option<u32>,
}

impl RecordMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_chunk(mut self, chunk: u32) -> Self {
        self.chunk = Some(chunk);
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(file) = &self.file {
            if file.trim().is_empty() {
                return Err(DomainError::invalid_input("metadata.file must not be blank"));
            }
        }

        Ok(())
    }
}

/// A record that has not been committed yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub text: String,
    pub vector: Vec<f32>,
    pub metadata: Option<RecordMetadata>,
}

impl NewRecord {
    pub fn new(text: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            text: text.into(),
            vector,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Option<RecordMetadata>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Check the record against the store's fixed dimension
    pub fn validate(&self, dimensions: usize) -> Result<(), DomainError> {
        if self.text.is_empty() {
            return Err(DomainError::invalid_input("record text must not be empty"));
        }

        if self.vector.len() != dimensions {
            return Err(DomainError::dimension_mismatch(dimensions, self.vector.len()));
        }

        if let Some(metadata) = &self.metadata {
            metadata.validate()?;
        }

        Ok(())
    }

    /// Stamp the record with an id and creation time
    pub fn commit(self) -> Record {
        Record {
            id: RecordId::generate(),
            text: self.text,
            vector: self.vector,
            metadata: self.metadata,
            created_at: Utc::now(),
        }
    }
}

/// An immutable stored record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    id: RecordId,
    text: String,
    vector: Vec<f32>,
    #[serde(default)]
    metadata: Option<RecordMetadata>,
    created_at: DateTime<Utc>,
}

impl Record {
    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn vector(&self) -> &[f32] {
        &self.vector
    }

    pub fn metadata(&self) -> Option<&RecordMetadata> {
        self.metadata.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_assigns_unique_ids() {
        let first = NewRecord::new("a", vec![1.0, 0.0]).commit();
        let second = NewRecord::new("a", vec![1.0, 0.0]).commit();

        assert_ne!(first.id(), second.id());
        assert_eq!(first.text(), "a");
        assert_eq!(first.vector(), &[1.0, 0.0]);
        assert!(first.metadata().is_none());
    }

    #[test]
    fn test_validate_dimension() {
        let record = NewRecord::new("a", vec![1.0, 0.0, 0.0]);

        assert!(record.validate(3).is_ok());
        assert!(matches!(
            record.validate(4),
            Err(DomainError::DimensionMismatch {
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_validate_rejects_empty_text() {
        let record = NewRecord::new("", vec![1.0]);
        assert!(matches!(
            record.validate(1),
            Err(DomainError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_metadata_validation() {
        let ok = RecordMetadata::new().with_file("notes.md").with_chunk(2);
        assert!(ok.validate().is_ok());

        let blank = RecordMetadata::new().with_file("  ");
        let record = NewRecord::new("a", vec![1.0]).with_metadata(Some(blank));
        assert!(matches!(
            record.validate(1),
            Err(DomainError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_metadata_rejects_unknown_fields() {
        let parsed: Result<RecordMetadata, _> =
            serde_json::from_str(r#"{"file": "a.md", "owner": "x"}"#);
        assert!(parsed.is_err());

        let parsed: RecordMetadata = serde_json::from_str(r#"{"chunk": 4}"#).unwrap();
        assert_eq!(parsed, RecordMetadata::new().with_chunk(4));
    }

    #[test]
    fn test_record_serde_roundtrip_keeps_fields() {
        let record = NewRecord::new("hello", vec![0.5, -0.5])
            .with_metadata(Some(RecordMetadata::new().with_file("f.txt")))
            .commit();

        let json = serde_json::to_string(&record).unwrap();
        let parsed: Record = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, record);
    }
}
