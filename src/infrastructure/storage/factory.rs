//! Storage factory for runtime store selection

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::{DomainError, RecordStore};

use super::file::FileRecordStore;
use super::in_memory::InMemoryRecordStore;

/// Supported storage types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    /// In-memory storage (for testing/development)
    InMemory,
    /// Append-only log on the local filesystem
    File,
}

impl StorageType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Some(Self::InMemory),
            "file" | "disk" | "local" => Some(Self::File),
            _ => None,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// `file` or `memory`
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Fixed snapshot location, overwritten on every refresh
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
    /// Scratch space for snapshot temp files
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
    /// Budget for record memory such as `4GB` or `512MB`; unlimited when unset
    #[serde(default)]
    pub memory_limit: Option<String>,
    /// Threads for blocking storage I/O
    #[serde(default = "default_threads")]
    pub threads: usize,
    #[serde(default = "default_io_timeout_ms")]
    pub io_timeout_ms: u64,
}

fn default_backend() -> String {
    "file".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("assets/db/data")
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("assets/db/snapshot/current.jsonl")
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("assets/db/temp")
}

fn default_threads() -> usize {
    4
}

fn default_io_timeout_ms() -> u64 {
    10_000
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            data_dir: default_data_dir(),
            snapshot_path: default_snapshot_path(),
            temp_dir: default_temp_dir(),
            memory_limit: None,
            threads: default_threads(),
            io_timeout_ms: default_io_timeout_ms(),
        }
    }
}

impl StorageConfig {
    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    pub fn storage_type(&self) -> Result<StorageType, DomainError> {
        StorageType::from_str(&self.backend).ok_or_else(|| {
            DomainError::configuration(format!("unknown storage backend '{}'", self.backend))
        })
    }

    pub fn memory_limit_bytes(&self) -> Result<Option<usize>, DomainError> {
        self.memory_limit.as_deref().map(parse_memory_limit).transpose()
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        self.storage_type()?;
        self.memory_limit_bytes()?;

        if self.io_timeout_ms == 0 {
            return Err(DomainError::configuration("storage.io_timeout_ms must be positive"));
        }

        if self.threads == 0 {
            return Err(DomainError::configuration("storage.threads must be positive"));
        }

        Ok(())
    }
}

/// Parse sizes like `512MB`, `4GB` or a plain byte count
pub fn parse_memory_limit(value: &str) -> Result<usize, DomainError> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);

    let amount: usize = digits.parse().map_err(|_| {
        DomainError::configuration(format!("invalid storage.memory_limit '{}'", value))
    })?;

    let multiplier: usize = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "KB" | "KIB" => 1 << 10,
        "MB" | "MIB" => 1 << 20,
        "GB" | "GIB" => 1 << 30,
        _ => {
            return Err(DomainError::configuration(format!(
                "invalid storage.memory_limit unit in '{}'",
                value
            )))
        }
    };

    amount.checked_mul(multiplier).ok_or_else(|| {
        DomainError::configuration(format!("storage.memory_limit '{}' overflows", value))
    })
}

/// Factory for creating record stores
#[derive(Debug)]
pub struct StorageFactory;

impl StorageFactory {
    /// Create the configured store; records are not loaded yet
    pub async fn create(
        config: &StorageConfig,
        dimensions: usize,
    ) -> Result<Arc<dyn RecordStore>, DomainError> {
        let memory_limit = config.memory_limit_bytes()?;

        match config.storage_type()? {
            StorageType::InMemory => Ok(Arc::new(
                InMemoryRecordStore::new(dimensions).with_memory_limit(memory_limit),
            )),
            StorageType::File => {
                let store =
                    FileRecordStore::open(&config.data_dir, dimensions, config.io_timeout()).await?;
                Ok(Arc::new(store.with_memory_limit(memory_limit)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_storage_type_from_str() {
        assert_eq!(StorageType::from_str("memory"), Some(StorageType::InMemory));
        assert_eq!(StorageType::from_str("In-Memory"), Some(StorageType::InMemory));
        assert_eq!(StorageType::from_str("file"), Some(StorageType::File));
        assert_eq!(StorageType::from_str("duckdb"), None);
    }

    #[test]
    fn test_parse_memory_limit() {
        assert_eq!(parse_memory_limit("1024").unwrap(), 1024);
        assert_eq!(parse_memory_limit("4GB").unwrap(), 4 << 30);
        assert_eq!(parse_memory_limit("512 mb").unwrap(), 512 << 20);
        assert!(parse_memory_limit("lots").is_err());
        assert!(parse_memory_limit("3TB").is_err());
    }

    #[test]
    fn test_default_layout() {
        let config = StorageConfig::default();

        assert_eq!(config.data_dir, PathBuf::from("assets/db/data"));
        assert_eq!(
            config.snapshot_path,
            PathBuf::from("assets/db/snapshot/current.jsonl")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let config = StorageConfig {
            backend: "duckdb".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = StorageConfig {
            io_timeout_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_create_file_store() {
        let dir = TempDir::new().unwrap();
        let config = StorageConfig {
            data_dir: dir.path().join("data"),
            ..Default::default()
        };

        let store = StorageFactory::create(&config, 3).await.unwrap();

        assert_eq!(store.dimensions(), 3);
        assert_eq!(store.load().await.unwrap(), 0);
        assert!(dir.path().join("data").join("manifest.json").exists());
    }

    #[tokio::test]
    async fn test_create_memory_store() {
        let config = StorageConfig {
            backend: "memory".to_string(),
            ..Default::default()
        };

        let store = StorageFactory::create(&config, 3).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
