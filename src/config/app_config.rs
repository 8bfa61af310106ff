use serde::Deserialize;

use crate::domain::semantic_cache::SemanticCacheConfig;
use crate::domain::DomainError;
use crate::infrastructure::embedding::EmbeddingConfig;
use crate::infrastructure::index::HnswConfig;
use crate::infrastructure::observability::MetricsConfig;
use crate::infrastructure::storage::StorageConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub cache: SemanticCacheConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub index: HnswConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    /// Layered load: `config/default`, `config/local`, then `APP__*` variables
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Cross-section checks the individual sections cannot make alone
    pub fn validate(&self) -> Result<(), DomainError> {
        self.cache.validate()?;
        self.storage.validate()?;
        self.index.validate()?;

        if self.embedding.timeout_ms == 0 {
            return Err(DomainError::configuration("embedding.timeout_ms must be positive"));
        }

        if !self.metrics.path.starts_with('/') {
            return Err(DomainError::configuration("metrics.path must start with '/'"));
        }

        Ok(())
    }
}
