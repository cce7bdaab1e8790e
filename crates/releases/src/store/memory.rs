use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{insert_record, remove_record, upsert_version, Records};
use super::{RepositoryRecord, RepositoryStore, StoreError};
use crate::request::RepositoryKey;

/// In-process store; contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryRepositoryStore {
    records: RwLock<Records>,
}

impl MemoryRepositoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `records`.
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = RepositoryRecord>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().map(|r| (r.key(), r)).collect()),
        }
    }

    pub async fn get(&self, key: &RepositoryKey) -> Option<RepositoryRecord> {
        self.records.read().await.get(key).cloned()
    }
}

#[async_trait]
impl RepositoryStore for MemoryRepositoryStore {
    async fn put_version(&self, key: &RepositoryKey, version: &str) -> Result<(), StoreError> {
        upsert_version(&mut *self.records.write().await, key, version);
        Ok(())
    }

    async fn create(&self, record: RepositoryRecord) -> Result<(), StoreError> {
        insert_record(&mut *self.records.write().await, record)
    }

    async fn delete(&self, key: &RepositoryKey) -> Result<(), StoreError> {
        remove_record(&mut *self.records.write().await, key)
    }

    async fn list(&self) -> Result<Vec<RepositoryRecord>, StoreError> {
        Ok(self.records.read().await.values().cloned().collect())
    }
}
