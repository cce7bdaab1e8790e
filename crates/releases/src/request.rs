//! Release request payload and validation.

use std::fmt;

use scm::{Backend, NewChangeRequest, ReleaseArtifact, RepositoryTarget};
use serde::{Deserialize, Serialize};

use crate::error::ReleaseError;

/// Input to a single release run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRequest {
    #[serde(default)]
    pub repo_owner: String,
    #[serde(default)]
    pub repo_name: String,
    /// Backend tag selecting the provider client, `github` or `gitlab`.
    #[serde(default)]
    pub repo_provider: Option<String>,
    #[serde(default)]
    pub branch_base: String,
    #[serde(default)]
    pub branch_head: String,
    #[serde(default)]
    pub release_version: String,
    #[serde(default)]
    pub release_body: String,
    /// Skip the change request and tag the base branch directly.
    #[serde(default)]
    pub hotfix: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitlab_project_id: Option<String>,
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Parse a backend tag, treating a missing or unknown tag as invalid input.
pub(crate) fn parse_backend(tag: Option<&str>) -> Result<Backend, ReleaseError> {
    tag.and_then(|t| t.parse().ok())
        .ok_or(ReleaseError::Validation { field: "repo_provider" })
}

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

impl ReleaseRequest {
    /// Strip surrounding whitespace from every identifying field.
    ///
    /// The release body is left as written.
    #[must_use]
    pub fn trimmed(mut self) -> Self {
        for field in [
            &mut self.repo_owner,
            &mut self.repo_name,
            &mut self.branch_base,
            &mut self.branch_head,
            &mut self.release_version,
        ] {
            trim_in_place(field);
        }
        for field in [&mut self.repo_provider, &mut self.gitlab_project_id]
            .into_iter()
            .flatten()
        {
            trim_in_place(field);
        }
        self
    }

    /// Check the request and return the backend it targets.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Validation`] naming the first invalid field.
    pub fn validate(&self) -> Result<Backend, ReleaseError> {
        let backend = parse_backend(self.repo_provider.as_deref())?;

        let checks: [(&'static str, bool); 6] = [
            ("repo_name", blank(&self.repo_name)),
            ("release_version", blank(&self.release_version)),
            ("repo_owner", backend == Backend::GitHub && blank(&self.repo_owner)),
            (
                "gitlab_project_id",
                backend == Backend::GitLab
                    && self.gitlab_project_id.as_deref().is_none_or(blank),
            ),
            ("branch_base", blank(&self.branch_base)),
            ("branch_head", !self.hotfix && blank(&self.branch_head)),
        ];

        match checks.into_iter().find(|(_, invalid)| *invalid) {
            Some((field, _)) => Err(ReleaseError::Validation { field }),
            None => Ok(backend),
        }
    }

    /// Key of the repository record this release updates.
    #[must_use]
    pub fn repository_key(&self) -> RepositoryKey {
        RepositoryKey::new(&self.repo_owner, &self.repo_name)
    }

    /// Repository the provider client is scoped to.
    #[must_use]
    pub fn target(&self) -> RepositoryTarget {
        let target = RepositoryTarget::new(&self.repo_owner, &self.repo_name);
        match &self.gitlab_project_id {
            Some(id) => target.with_project_id(id),
            None => target,
        }
    }

    /// Change request proposing `branch_head` into `branch_base`.
    #[must_use]
    pub fn change_request(&self) -> NewChangeRequest {
        NewChangeRequest {
            title: self.release_version.clone(),
            body: self.release_body.clone(),
            head: self.branch_head.clone(),
            base: self.branch_base.clone(),
        }
    }

    /// Release tagged from `branch_base`.
    #[must_use]
    pub fn release_artifact(&self) -> ReleaseArtifact {
        ReleaseArtifact {
            tag_name: self.release_version.clone(),
            name: self.release_version.clone(),
            body: self.release_body.clone(),
            target: self.branch_base.clone(),
        }
    }
}

/// Repository identity used as the version store key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RepositoryKey {
    pub owner: String,
    pub name: String,
}

impl RepositoryKey {
    #[must_use]
    pub fn new(owner: &str, name: &str) -> Self {
        Self {
            owner: owner.trim().to_string(),
            name: name.trim().to_string(),
        }
    }
}

impl fmt::Display for RepositoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
