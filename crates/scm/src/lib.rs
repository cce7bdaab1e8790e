//! Unified SCM abstraction for GitHub and GitLab.
//!
//! This crate provides:
//! - [`ProviderClient`], the capability interface the release workflow drives
//! - [`GitHubClient`] for pull requests and releases on GitHub
//! - [`GitLabClient`] for merge requests and releases on GitLab
//! - [`connect`] to build a client for one repository from a [`Backend`] tag
//!
//! # Example
//!
//! ```no_run
//! use scm::{connect, Backend, NewChangeRequest, ProviderSettings, RepositoryTarget};
//!
//! # async fn example() -> Result<(), scm::ScmError> {
//! let settings = ProviderSettings::default();
//! let target = RepositoryTarget::new("acme", "billing-api");
//! let client = connect(Backend::GitHub, &target, &settings)?;
//!
//! let change_request = client
//!     .create_change_request(&NewChangeRequest {
//!         title: "v1.4.0".to_string(),
//!         body: "Release notes".to_string(),
//!         head: "develop".to_string(),
//!         base: "main".to_string(),
//!     })
//!     .await?;
//! let merged = client.merge_change_request(change_request.id).await?;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod github;
pub mod gitlab;
pub mod settings;

mod http;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use error::ScmError;
pub use github::GitHubClient;
pub use gitlab::GitLabClient;
pub use settings::{connect, BackendSettings, ProviderSettings, RepositoryTarget};

/// Source-control hosting backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Backend {
    /// github.com or GitHub Enterprise
    GitHub,
    /// gitlab.com or a self-managed GitLab instance
    GitLab,
}

impl Backend {
    /// Lowercase tag used on the wire and in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::GitLab => "gitlab",
        }
    }

    /// Product name for user-facing messages.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::GitHub => "GitHub",
            Self::GitLab => "GitLab",
        }
    }

    /// What this backend calls a change request.
    #[must_use]
    pub const fn change_request_noun(self) -> &'static str {
        match self {
            Self::GitHub => "pull request",
            Self::GitLab => "merge request",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Backend {
    type Err = ScmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "github" => Ok(Self::GitHub),
            "gitlab" => Ok(Self::GitLab),
            other => Err(ScmError::Configuration(format!(
                "unknown provider '{other}' (expected github or gitlab)"
            ))),
        }
    }
}

impl TryFrom<String> for Backend {
    type Error = ScmError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Provider-reported readiness of a change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStatus {
    /// The provider has not finished computing mergeability.
    Unresolved,
    /// Can be merged without conflicts.
    Mergeable,
    /// Has conflicts with the target branch.
    Conflicting,
    /// Already merged.
    Merged,
}

impl MergeStatus {
    /// Interpret GitHub's `mergeable` / `merged` pull request fields.
    #[must_use]
    pub const fn from_github(mergeable: Option<bool>, merged: bool) -> Self {
        if merged {
            return Self::Merged;
        }
        match mergeable {
            Some(true) => Self::Mergeable,
            Some(false) => Self::Conflicting,
            None => Self::Unresolved,
        }
    }

    /// Interpret GitLab's `state` / `merge_status` merge request fields.
    #[must_use]
    pub fn from_gitlab(state: Option<&str>, merge_status: Option<&str>) -> Self {
        if state == Some("merged") {
            return Self::Merged;
        }
        match merge_status {
            Some("can_be_merged") => Self::Mergeable,
            Some("cannot_be_merged") => Self::Conflicting,
            _ => Self::Unresolved,
        }
    }
}

/// Input for opening a pull/merge request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChangeRequest {
    pub title: String,
    pub body: String,
    /// Source branch.
    pub head: String,
    /// Target branch.
    pub base: String,
}

/// An open pull/merge request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRequest {
    /// Provider-assigned number (GitHub `number`, GitLab `iid`).
    pub id: u64,
    pub status: MergeStatus,
    pub web_url: Option<String>,
}

/// Tagged release to create on the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseArtifact {
    pub tag_name: String,
    pub name: String,
    pub body: String,
    /// Branch the tag is cut from.
    pub target: String,
}

/// Remote change-request and release operations for one repository.
///
/// A client is scoped to a single repository and credential; build a fresh one
/// per release run with [`connect`].
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Backend this client talks to.
    fn backend(&self) -> Backend;

    /// Whether mergeability must be polled before merging.
    ///
    /// GitHub detects conflicts atomically in the merge call; GitLab computes
    /// `merge_status` asynchronously after creation.
    fn requires_mergeability_poll(&self) -> bool;

    /// Open a pull/merge request.
    async fn create_change_request(
        &self,
        request: &NewChangeRequest,
    ) -> Result<ChangeRequest, ScmError>;

    /// Read the current merge status without changing anything.
    async fn query_mergeability(&self, id: u64) -> Result<MergeStatus, ScmError>;

    /// Attempt the merge. `Ok(false)` means the provider answered but did not merge.
    async fn merge_change_request(&self, id: u64) -> Result<bool, ScmError>;

    /// Create a tagged release. Fails if the tag already exists.
    async fn create_release(&self, release: &ReleaseArtifact) -> Result<(), ScmError>;
}
