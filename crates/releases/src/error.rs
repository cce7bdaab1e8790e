//! Release error taxonomy and status mapping.

use std::collections::HashMap;
use std::str::FromStr;

use notify::ChannelError;
use scm::{Backend, ScmError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::Step;
use crate::store::StoreError;

/// Uniform classification of release failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    ProviderAuth,
    ProviderRequest,
    MergeConflict,
    MergeTimeout,
    MergeFailed,
    Persistence,
    Notification,
    Configuration,
}

impl FromStr for ErrorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "validation" => Ok(Self::Validation),
            "provider_auth" => Ok(Self::ProviderAuth),
            "provider_request" => Ok(Self::ProviderRequest),
            "merge_conflict" => Ok(Self::MergeConflict),
            "merge_timeout" => Ok(Self::MergeTimeout),
            "merge_failed" => Ok(Self::MergeFailed),
            "persistence" => Ok(Self::Persistence),
            "notification" => Ok(Self::Notification),
            "configuration" => Ok(Self::Configuration),
            other => Err(format!("unknown error kind '{other}'")),
        }
    }
}

/// Errors that end or annotate a release run.
///
/// The `Display` text is the user-facing message.
#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("{field} is invalid")]
    Validation { field: &'static str },

    #[error("Unable to authenticate with {provider}, please check the configured credentials")]
    ProviderAuth {
        provider: Backend,
        #[source]
        source: ScmError,
    },

    #[error("{action} failed for {repo}, please check {provider} for further details")]
    ProviderRequest {
        step: Step,
        action: String,
        repo: String,
        provider: Backend,
        #[source]
        source: ScmError,
    },

    #[error(
        "{repo} {} {id} has merge conflicts, please check {provider} for further details",
        .provider.change_request_noun()
    )]
    MergeConflict {
        repo: String,
        id: u64,
        provider: Backend,
    },

    #[error(
        "{repo} {} {id} never became mergeable after {attempts} checks, please check {provider} for further details",
        .provider.change_request_noun()
    )]
    MergeTimeout {
        repo: String,
        id: u64,
        provider: Backend,
        attempts: u32,
    },

    #[error(
        "Unable to merge {repo} {} {id} for version {version}, please check {provider} for further details",
        .provider.change_request_noun()
    )]
    MergeFailed {
        repo: String,
        version: String,
        id: u64,
        provider: Backend,
        #[source]
        source: Option<ScmError>,
    },

    #[error("failed to record latest version")]
    Persistence(#[from] StoreError),

    #[error("failed to send release notification")]
    Notification(#[from] ChannelError),

    #[error("{provider} is not configured for releases: {source}")]
    Configuration {
        provider: Backend,
        #[source]
        source: ScmError,
    },
}

impl ReleaseError {
    /// Map a provider failure raised during `step`.
    #[must_use]
    pub fn from_provider(step: Step, repo: &str, provider: Backend, source: ScmError) -> Self {
        if source.is_configuration() {
            Self::Configuration { provider, source }
        } else if source.is_auth() {
            Self::ProviderAuth { provider, source }
        } else {
            Self::ProviderRequest {
                step,
                action: step.action(provider),
                repo: repo.to_string(),
                provider,
                source,
            }
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::ProviderAuth { .. } => ErrorKind::ProviderAuth,
            Self::ProviderRequest { .. } => ErrorKind::ProviderRequest,
            Self::MergeConflict { .. } => ErrorKind::MergeConflict,
            Self::MergeTimeout { .. } => ErrorKind::MergeTimeout,
            Self::MergeFailed { .. } => ErrorKind::MergeFailed,
            Self::Persistence(_) => ErrorKind::Persistence,
            Self::Notification(_) => ErrorKind::Notification,
            Self::Configuration { .. } => ErrorKind::Configuration,
        }
    }
}

/// HTTP status assigned to each outcome.
///
/// Every failure kind answers 400 unless overridden. `Persistence` and
/// `Notification` only occur after a release was cut and share the success
/// status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMapping {
    success: u16,
    failure: u16,
    overrides: HashMap<ErrorKind, u16>,
}

impl Default for StatusMapping {
    fn default() -> Self {
        Self {
            success: 200,
            failure: 400,
            overrides: HashMap::new(),
        }
    }
}

impl StatusMapping {
    /// Override the status for one kind.
    #[must_use]
    pub fn with_status(mut self, kind: ErrorKind, status: u16) -> Self {
        self.overrides.insert(kind, status);
        self
    }

    /// Parse `kind=status` pairs, e.g. `merge_conflict=409,merge_timeout=504`.
    ///
    /// # Errors
    ///
    /// Returns a description of the first malformed entry.
    pub fn parse_overrides(overrides: &str) -> Result<Self, String> {
        let mut mapping = Self::default();
        for entry in overrides.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (kind, status) = entry
                .split_once('=')
                .ok_or_else(|| format!("expected kind=status, got '{entry}'"))?;
            let kind: ErrorKind = kind.parse()?;
            let status: u16 = status
                .trim()
                .parse()
                .map_err(|_| format!("invalid status '{}' for {kind:?}", status.trim()))?;
            if !(100..=599).contains(&status) {
                return Err(format!("status {status} for {kind:?} is out of range"));
            }
            mapping = mapping.with_status(kind, status);
        }
        Ok(mapping)
    }

    #[must_use]
    pub const fn success(&self) -> u16 {
        self.success
    }

    #[must_use]
    pub fn status_for(&self, kind: ErrorKind) -> u16 {
        if let Some(status) = self.overrides.get(&kind) {
            return *status;
        }
        match kind {
            ErrorKind::Persistence | ErrorKind::Notification => self.success,
            _ => self.failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error() -> ScmError {
        ScmError::Api {
            provider: Backend::GitHub,
            status: 422,
            body: "Validation Failed".to_string(),
        }
    }

    #[test]
    fn test_provider_request_message() {
        let err = ReleaseError::from_provider(Step::CreateChangeRequest, "svc", Backend::GitHub, api_error());
        assert_eq!(err.kind(), ErrorKind::ProviderRequest);
        assert_eq!(
            err.to_string(),
            "Creating pull request failed for svc, please check GitHub for further details"
        );
    }

    #[test]
    fn test_auth_failures_are_classified_at_the_boundary() {
        let source = ScmError::Auth {
            provider: Backend::GitLab,
            status: 401,
        };
        let err = ReleaseError::from_provider(Step::CreateRelease, "svc", Backend::GitLab, source);
        assert_eq!(err.kind(), ErrorKind::ProviderAuth);
        assert!(err.to_string().contains("GitLab"));
    }

    #[test]
    fn test_merge_messages() {
        let conflict = ReleaseError::MergeConflict {
            repo: "svc".to_string(),
            id: 8,
            provider: Backend::GitLab,
        };
        assert_eq!(
            conflict.to_string(),
            "svc merge request 8 has merge conflicts, please check GitLab for further details"
        );

        let timeout = ReleaseError::MergeTimeout {
            repo: "svc".to_string(),
            id: 8,
            provider: Backend::GitLab,
            attempts: 7,
        };
        assert!(timeout.to_string().contains("never became mergeable after 7 checks"));
    }

    #[test]
    fn test_default_status_mapping() {
        let mapping = StatusMapping::default();
        assert_eq!(mapping.success(), 200);
        assert_eq!(mapping.status_for(ErrorKind::MergeConflict), 400);
        assert_eq!(mapping.status_for(ErrorKind::ProviderAuth), 400);
        assert_eq!(mapping.status_for(ErrorKind::Persistence), 200);
        assert_eq!(mapping.status_for(ErrorKind::Notification), 200);
    }

    #[test]
    fn test_parse_overrides() {
        let mapping = StatusMapping::parse_overrides("merge_conflict=409, merge_timeout=504").unwrap();
        assert_eq!(mapping.status_for(ErrorKind::MergeConflict), 409);
        assert_eq!(mapping.status_for(ErrorKind::MergeTimeout), 504);
        assert_eq!(mapping.status_for(ErrorKind::Validation), 400);

        assert!(StatusMapping::parse_overrides("merge_conflict").is_err());
        assert!(StatusMapping::parse_overrides("bogus=400").is_err());
        assert!(StatusMapping::parse_overrides("validation=42").is_err());
        assert_eq!(StatusMapping::parse_overrides("").unwrap(), StatusMapping::default());
    }
}
