//! In-memory [`RecordStore`] backed by a `HashMap` behind a reader/writer lock.
//!
//! Writers take the exclusive lock for the duration of a single insert;
//! readers share the lock. Contents live only as long as the process.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use roster_core::{Record, RecordDraft};

use super::{new_record_id, RecordStore, StoreError};

/// Volatile record store.
///
/// Lock hold times never span an `.await`, so a blocking `parking_lot` lock
/// is used rather than an async one.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, RecordDraft>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert(&self, draft: RecordDraft) -> Result<String, StoreError> {
        let id = new_record_id();
        self.entries.write().insert(id.clone(), draft);
        Ok(id)
    }

    async fn fetch_all(&self) -> Result<Vec<Record>, StoreError> {
        let entries = self.entries.read();
        Ok(entries
            .iter()
            .map(|(id, draft)| Record::from_draft(id.clone(), draft.clone()))
            .collect())
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Record, StoreError> {
        self.entries
            .read()
            .get(id)
            .map(|draft| Record::from_draft(id, draft.clone()))
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
