use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use super::{insert_record, remove_record, upsert_version, Records};
use super::{RepositoryRecord, RepositoryStore, StoreError};
use crate::request::RepositoryKey;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    repositories: Vec<RepositoryRecord>,
}

/// Store backed by a single JSON document.
///
/// Every mutation rewrites the whole document through a temporary file and a
/// rename, so readers never observe a partial write.
#[derive(Debug)]
pub struct FileRepositoryStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileRepositoryStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Records, StoreError> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Records::new()),
            Err(e) => return Err(e.into()),
        };
        let document: Document = serde_json::from_slice(&contents)?;
        Ok(document
            .repositories
            .into_iter()
            .map(|r| (r.key(), r))
            .collect())
    }

    async fn save(&self, records: Records) -> Result<(), StoreError> {
        let document = Document {
            repositories: records.into_values().collect(),
        };
        let contents = serde_json::to_vec_pretty(&document)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), "Repository store saved");
        Ok(())
    }

    async fn update<F>(&self, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Records) -> Result<(), StoreError> + Send,
    {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        apply(&mut records)?;
        self.save(records).await
    }
}

#[async_trait]
impl RepositoryStore for FileRepositoryStore {
    async fn put_version(&self, key: &RepositoryKey, version: &str) -> Result<(), StoreError> {
        self.update(|records| {
            upsert_version(records, key, version);
            Ok(())
        })
        .await
    }

    async fn create(&self, record: RepositoryRecord) -> Result<(), StoreError> {
        self.update(|records| insert_record(records, record)).await
    }

    async fn delete(&self, key: &RepositoryKey) -> Result<(), StoreError> {
        self.update(|records| remove_record(records, key)).await
    }

    async fn list(&self) -> Result<Vec<RepositoryRecord>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.into_values().collect())
    }
}
