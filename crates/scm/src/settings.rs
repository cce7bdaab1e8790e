//! Per-backend connection settings and client construction.

use std::time::Duration;

use tracing::debug;

use crate::github::GITHUB_API_URL;
use crate::gitlab::GITLAB_API_URL;
use crate::{Backend, GitHubClient, GitLabClient, ProviderClient, ScmError};

/// Default timeout applied to every provider request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// API location and credential for one backend.
#[derive(Clone)]
pub struct BackendSettings {
    pub api_url: String,
    pub token: Option<String>,
}

impl std::fmt::Debug for BackendSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendSettings")
            .field("api_url", &self.api_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Settings for both backends.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub github: BackendSettings,
    pub gitlab: BackendSettings,
    pub request_timeout: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            github: BackendSettings {
                api_url: GITHUB_API_URL.to_string(),
                token: None,
            },
            gitlab: BackendSettings {
                api_url: GITLAB_API_URL.to_string(),
                token: None,
            },
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ProviderSettings {
    /// Settings for the given backend.
    #[must_use]
    pub const fn for_backend(&self, backend: Backend) -> &BackendSettings {
        match backend {
            Backend::GitHub => &self.github,
            Backend::GitLab => &self.gitlab,
        }
    }
}

/// Repository a client is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryTarget {
    pub owner: String,
    pub name: String,
    /// GitLab project ID or `namespace/path`; unused by GitHub.
    pub project_id: Option<String>,
}

impl RepositoryTarget {
    #[must_use]
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            project_id: None,
        }
    }

    #[must_use]
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }
}

/// Build a fresh client for `target` on `backend`.
///
/// Nothing is sent to the provider here, so configuration problems surface
/// before any remote call.
///
/// # Errors
///
/// Returns [`ScmError::Configuration`] if the backend has no token, the GitLab
/// project id is missing, or the HTTP client cannot be built.
pub fn connect(
    backend: Backend,
    target: &RepositoryTarget,
    settings: &ProviderSettings,
) -> Result<Box<dyn ProviderClient>, ScmError> {
    let backend_settings = settings.for_backend(backend);
    let token = backend_settings
        .token
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ScmError::Configuration(format!("no {backend} token configured")))?;

    debug!(provider = backend.as_str(), repo = %target.name, "Building provider client");

    match backend {
        Backend::GitHub => Ok(Box::new(GitHubClient::new(
            &backend_settings.api_url,
            token,
            &target.owner,
            &target.name,
            settings.request_timeout,
        )?)),
        Backend::GitLab => {
            let project_id = target.project_id.as_deref().ok_or_else(|| {
                ScmError::Configuration("GitLab project id is required".into())
            })?;
            Ok(Box::new(GitLabClient::new(
                &backend_settings.api_url,
                token,
                project_id,
                settings.request_timeout,
            )?))
        }
    }
}
