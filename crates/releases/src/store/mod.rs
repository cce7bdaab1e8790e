//! Repository records and the latest released version.
//!
//! [`RepositoryStore`] is the persistence seam. Two adapters ship with the
//! crate: [`MemoryRepositoryStore`] for tests and single-process use, and
//! [`FileRepositoryStore`], which keeps every record in one JSON document.

mod file;
mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use file::FileRepositoryStore;
pub use memory::MemoryRepositoryStore;

use crate::request::RepositoryKey;

/// Version store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Repository not found: {0}")]
    NotFound(String),

    #[error("Repository already exists: {0}")]
    AlreadyExists(String),
}

/// A tracked repository and its most recent release.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    #[serde(default)]
    pub repo_name: String,
    #[serde(default)]
    pub repo_owner: String,
    /// Lowercase backend tag, `github` or `gitlab`.
    #[serde(default)]
    pub repo_provider: Option<String>,
    #[serde(default)]
    pub branch_base: String,
    #[serde(default)]
    pub branch_head: String,
    #[serde(default)]
    pub current_version: String,
    #[serde(
        default,
        alias = "gitlab_repo_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub gitlab_project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RepositoryRecord {
    #[must_use]
    pub fn key(&self) -> RepositoryKey {
        RepositoryKey::new(&self.repo_owner, &self.repo_name)
    }

    /// Record created when a version is stored for an unknown repository.
    fn placeholder(key: &RepositoryKey) -> Self {
        Self {
            repo_name: key.name.clone(),
            repo_owner: key.owner.clone(),
            ..Self::default()
        }
    }

    fn set_version(&mut self, version: &str) {
        version.clone_into(&mut self.current_version);
        self.updated_at = Some(Utc::now());
    }
}

/// Persistence for repository records.
#[async_trait]
pub trait RepositoryStore: Send + Sync {
    /// Record `version` as the latest release of `key`, creating a minimal
    /// record if the repository is not tracked yet.
    async fn put_version(&self, key: &RepositoryKey, version: &str) -> Result<(), StoreError>;

    /// Start tracking a repository.
    async fn create(&self, record: RepositoryRecord) -> Result<(), StoreError>;

    /// Stop tracking a repository.
    async fn delete(&self, key: &RepositoryKey) -> Result<(), StoreError>;

    /// All tracked repositories ordered by key.
    async fn list(&self) -> Result<Vec<RepositoryRecord>, StoreError>;
}

type Records = std::collections::BTreeMap<RepositoryKey, RepositoryRecord>;

fn upsert_version(records: &mut Records, key: &RepositoryKey, version: &str) {
    records
        .entry(key.clone())
        .or_insert_with(|| RepositoryRecord::placeholder(key))
        .set_version(version);
}

fn insert_record(records: &mut Records, record: RepositoryRecord) -> Result<(), StoreError> {
    let key = record.key();
    if records.contains_key(&key) {
        return Err(StoreError::AlreadyExists(key.to_string()));
    }
    records.insert(key, record);
    Ok(())
}

fn remove_record(records: &mut Records, key: &RepositoryKey) -> Result<(), StoreError> {
    records
        .remove(key)
        .map(|_| ())
        .ok_or_else(|| StoreError::NotFound(key.to_string()))
}
