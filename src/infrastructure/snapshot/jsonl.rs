//! JSON Lines snapshot export
//!
//! One record per line, `{id, text, vector, metadata, created_at}`, in
//! insertion order. The file is assembled in the temp directory, fsynced,
//! then renamed over the snapshot path, so a reader sees either the previous
//! snapshot or the complete new one.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::domain::record::Record;
use crate::domain::snapshot::SnapshotWriter;
use crate::domain::DomainError;
use crate::infrastructure::storage::run_blocking;

/// Atomic JSON Lines snapshot writer
#[derive(Debug, Clone)]
pub struct JsonlSnapshotWriter {
    path: PathBuf,
    temp_dir: PathBuf,
    io_timeout: Duration,
}

impl JsonlSnapshotWriter {
    pub fn new(path: impl Into<PathBuf>, temp_dir: impl Into<PathBuf>, io_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            temp_dir: temp_dir.into(),
            io_timeout,
        }
    }

    fn encode(records: &[Record]) -> Result<Vec<u8>, DomainError> {
        let mut body = Vec::new();

        for record in records {
            serde_json::to_writer(&mut body, record)
                .map_err(|e| DomainError::internal(format!("Failed to serialize record: {}", e)))?;
            body.push(b'\n');
        }

        Ok(body)
    }
}

fn persist(body: &[u8], temp: &Path, target: &Path) -> Result<(), DomainError> {
    if let Some(parent) = temp.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = File::create(temp)?;
    file.write_all(body)?;
    file.sync_all()?;
    drop(file);

    std::fs::rename(temp, target)?;

    // Make the rename itself durable
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        File::open(parent)?.sync_all()?;
    }

    Ok(())
}

#[async_trait]
impl SnapshotWriter for JsonlSnapshotWriter {
    fn location(&self) -> PathBuf {
        self.path.clone()
    }

    async fn write(&self, records: &[Record]) -> Result<usize, DomainError> {
        let body = Self::encode(records)?;
        let count = records.len();

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                DomainError::configuration(format!(
                    "snapshot path {} has no file name",
                    self.path.display()
                ))
            })?;
        let temp = self
            .temp_dir
            .join(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));
        let target = self.path.clone();

        run_blocking("write snapshot", self.io_timeout, move || {
            let result = persist(&body, &temp, &target);
            if result.is_err() {
                let _ = std::fs::remove_file(&temp);
            }
            result
        })
        .await?;

        info!(path = %self.path.display(), records = count, "Snapshot written");
        Ok(count)
    }
}

/// Read a snapshot back, in the order it was written
pub async fn read_snapshot(path: impl AsRef<Path>) -> Result<Vec<Record>, DomainError> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path).await?;

    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|e| {
                DomainError::storage_io(format!(
                    "{} line {} is corrupt: {}",
                    path.display(),
                    i + 1,
                    e
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::{NewRecord, RecordMetadata};
    use tempfile::TempDir;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn records() -> Vec<Record> {
        vec![
            NewRecord::new("first", vec![1.0, 0.0])
                .with_metadata(Some(RecordMetadata::new().with_file("a.md").with_chunk(0)))
                .commit(),
            NewRecord::new("second", vec![0.0, 1.0]).commit(),
        ]
    }

    #[tokio::test]
    async fn test_write_and_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot").join("current.jsonl");
        let writer = JsonlSnapshotWriter::new(&path, dir.path().join("temp"), TIMEOUT);
        let records = records();

        assert_eq!(writer.write(&records).await.unwrap(), 2);
        assert_eq!(read_snapshot(&path).await.unwrap(), records);
        assert_eq!(writer.location(), path);
    }

    #[tokio::test]
    async fn test_overwrites_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("current.jsonl");
        let writer = JsonlSnapshotWriter::new(&path, dir.path().join("temp"), TIMEOUT);

        writer.write(&records()).await.unwrap();
        let replacement = vec![NewRecord::new("only", vec![1.0, 1.0]).commit()];
        writer.write(&replacement).await.unwrap();

        assert_eq!(read_snapshot(&path).await.unwrap(), replacement);
    }

    #[tokio::test]
    async fn test_empty_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("current.jsonl");
        let writer = JsonlSnapshotWriter::new(&path, dir.path(), TIMEOUT);

        assert_eq!(writer.write(&[]).await.unwrap(), 0);
        assert!(read_snapshot(&path).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_keeps_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("current.jsonl");
        let writer = JsonlSnapshotWriter::new(&path, dir.path().join("temp"), TIMEOUT);
        let records = records();
        writer.write(&records).await.unwrap();

        // A regular file where the temp directory should be
        let blocked = dir.path().join("blocked");
        std::fs::write(&blocked, b"").unwrap();
        let broken = JsonlSnapshotWriter::new(&path, &blocked, TIMEOUT);

        let result = broken.write(&[]).await;
        assert!(matches!(result, Err(DomainError::StorageIo { .. })));
        assert_eq!(read_snapshot(&path).await.unwrap(), records);
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let result = read_snapshot(dir.path().join("absent.jsonl")).await;

        assert!(matches!(result, Err(DomainError::StorageIo { .. })));
    }
}
