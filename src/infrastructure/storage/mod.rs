//! Storage infrastructure - Record store implementations

mod factory;
mod file;
mod in_memory;

pub use factory::{parse_memory_limit, StorageConfig, StorageFactory, StorageType};
pub use file::FileRecordStore;
pub use in_memory::InMemoryRecordStore;

use std::time::Duration;

use crate::domain::DomainError;

/// Run blocking filesystem work off the async runtime, bounded by `timeout`
pub(crate) async fn run_blocking<T, F>(
    operation: &str,
    timeout: Duration,
    work: F,
) -> Result<T, DomainError>
where
    F: FnOnce() -> Result<T, DomainError> + Send + 'static,
    T: Send + 'static,
{
    let task = tokio::task::spawn_blocking(work);

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(DomainError::internal(format!("{} task failed: {}", operation, e))),
        Err(_) => Err(DomainError::timeout(operation, timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_blocking_returns_result() {
        let value = run_blocking("add", Duration::from_secs(1), || Ok(2 + 2))
            .await
            .unwrap();
        assert_eq!(value, 4);
    }

    #[tokio::test]
    async fn test_run_blocking_times_out() {
        let result: Result<(), _> = run_blocking("sleep", Duration::from_millis(20), || {
            std::thread::sleep(Duration::from_millis(500));
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(DomainError::Timeout { .. })));
    }
}
