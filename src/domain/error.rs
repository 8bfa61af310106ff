use std::time::Duration;

use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Provider unavailable: {provider} - {message}")]
    ProviderUnavailable { provider: String, message: String },

    #[error("Storage I/O error: {message}")]
    StorageIo { message: String },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Index corruption: {message}")]
    IndexCorruption { message: String },

    #[error("Timed out after {after:?}: {operation}")]
    Timeout { operation: String, after: Duration },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn provider_unavailable(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn storage_io(message: impl Into<String>) -> Self {
        Self::StorageIo {
            message: message.into(),
        }
    }

    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    pub fn index_corruption(message: impl Into<String>) -> Self {
        Self::IndexCorruption {
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Errors that the index recovers from by rebuilding out of the record store
    pub fn requires_index_rebuild(&self) -> bool {
        matches!(
            self,
            Self::IndexCorruption { .. } | Self::DimensionMismatch { .. }
        )
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        Self::storage_io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_error() {
        let error = DomainError::invalid_input("text must not be empty");
        assert_eq!(error.to_string(), "Invalid input: text must not be empty");
    }

    #[test]
    fn test_dimension_mismatch_error() {
        let error = DomainError::dimension_mismatch(3, 4);
        assert_eq!(error.to_string(), "Dimension mismatch: expected 3, got 4");
        assert!(error.requires_index_rebuild());
    }

    #[test]
    fn test_provider_unavailable_error() {
        let error = DomainError::provider_unavailable("ollama", "connection refused");
        assert_eq!(
            error.to_string(),
            "Provider unavailable: ollama - connection refused"
        );
        assert!(!error.requires_index_rebuild());
    }

    #[test]
    fn test_io_error_maps_to_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error: DomainError = io.into();
        assert!(matches!(error, DomainError::StorageIo { .. }));
    }
}
