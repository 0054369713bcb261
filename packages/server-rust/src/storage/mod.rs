//! Record persistence.
//!
//! [`RecordStore`] is the capability set the service layer depends on. Two
//! implementations exist and one is chosen at startup:
//!
//! - [`SqlStore`]: durable, transactional, backed by a shared `sqlx` pool
//! - [`MemoryStore`]: volatile map behind a reader/writer lock
//!
//! [`migrate`] holds the schema migrations and the connect-with-retry
//! bootstrap used by the migration binary.

pub mod error;
pub mod memory;
pub mod migrate;
pub mod sql;

use std::sync::Arc;

use async_trait::async_trait;
use roster_core::{Record, RecordDraft};
use tracing::info;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use sql::{DatabaseConfig, SqlStore};

use crate::config::{StoreConfig, StoreKind};

/// Persistence capabilities required by the record service.
///
/// Implementations are shared as `Arc<dyn RecordStore>` across all request
/// handlers and must tolerate concurrent calls.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persists a new record and returns its freshly generated identifier.
    async fn insert(&self, draft: RecordDraft) -> Result<String, StoreError>;

    /// Returns every stored record. An empty store yields an empty vector.
    async fn fetch_all(&self) -> Result<Vec<Record>, StoreError>;

    /// Returns the record with the given id, or `StoreError::NotFound`.
    async fn fetch_by_id(&self, id: &str) -> Result<Record, StoreError>;

    /// Human-readable backend name for logs.
    fn backend_name(&self) -> &'static str;

    /// Releases pooled resources. Defaults to a no-op.
    async fn close(&self) {}
}

/// Generates a new record identifier.
pub(crate) fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Opens the store selected by configuration.
///
/// # Errors
///
/// Returns an error if the SQL backend cannot connect or its configuration
/// is invalid. The memory backend never fails.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn RecordStore>, StoreError> {
    let store: Arc<dyn RecordStore> = match config.kind {
        StoreKind::Memory => Arc::new(MemoryStore::new()),
        StoreKind::Sql => {
            Arc::new(SqlStore::connect(&config.database, config.operation_timeout).await?)
        }
    };
    info!(backend = store.backend_name(), "record store opened");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn record_ids_are_unique_uuids() {
        let ids: HashSet<String> = (0..1000).map(|_| new_record_id()).collect();
        assert_eq!(ids.len(), 1000);
        for id in &ids {
            assert!(uuid::Uuid::parse_str(id).is_ok());
        }
    }

    #[tokio::test]
    async fn open_store_memory_backend() {
        let store = open_store(&StoreConfig::default()).await.unwrap();
        assert_eq!(store.backend_name(), "memory");
        assert!(store.fetch_all().await.unwrap().is_empty());
    }
}
