//! Release run states and transitions.
//!
//! ```text
//! CreateChangeRequest -> [PollMergeability] -> Merge -> CreateRelease -> UpdateVersionRecord -> Notify
//! ```
//!
//! Hotfixes start at `CreateRelease`. `PollMergeability` is only entered for
//! backends that report mergeability asynchronously.

use std::fmt;

use scm::Backend;
use serde::Serialize;

/// One step of a release run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    CreateChangeRequest,
    PollMergeability,
    Merge,
    CreateRelease,
    UpdateVersionRecord,
    Notify,
}

impl Step {
    /// First step of a run.
    #[must_use]
    pub const fn first(hotfix: bool) -> Self {
        if hotfix {
            Self::CreateRelease
        } else {
            Self::CreateChangeRequest
        }
    }

    /// Step after this one, or `None` when the run is done.
    #[must_use]
    pub const fn next(self, requires_poll: bool) -> Option<Self> {
        match self {
            Self::CreateChangeRequest if requires_poll => Some(Self::PollMergeability),
            Self::CreateChangeRequest | Self::PollMergeability => Some(Self::Merge),
            Self::Merge => Some(Self::CreateRelease),
            Self::CreateRelease => Some(Self::UpdateVersionRecord),
            Self::UpdateVersionRecord => Some(Self::Notify),
            Self::Notify => None,
        }
    }

    /// Steps whose failure leaves the release in place.
    #[must_use]
    pub const fn is_post_release(self) -> bool {
        matches!(self, Self::UpdateVersionRecord | Self::Notify)
    }

    /// Snake-case name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateChangeRequest => "create_change_request",
            Self::PollMergeability => "poll_mergeability",
            Self::Merge => "merge",
            Self::CreateRelease => "create_release",
            Self::UpdateVersionRecord => "update_version_record",
            Self::Notify => "notify",
        }
    }

    /// Human-readable action, e.g. "Creating merge request".
    #[must_use]
    pub fn action(self, backend: Backend) -> String {
        let noun = backend.change_request_noun();
        match self {
            Self::CreateChangeRequest => format!("Creating {noun}"),
            Self::PollMergeability => format!("Checking {noun} mergeability"),
            Self::Merge => format!("Merging {noun}"),
            Self::CreateRelease => "Creating release".to_string(),
            Self::UpdateVersionRecord => "Recording latest version".to_string(),
            Self::Notify => "Sending release notification".to_string(),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(hotfix: bool, requires_poll: bool) -> Vec<Step> {
        let mut steps = vec![];
        let mut step = Some(Step::first(hotfix));
        while let Some(current) = step {
            steps.push(current);
            step = current.next(requires_poll);
        }
        steps
    }

    #[test]
    fn test_polling_backend_path() {
        assert_eq!(
            walk(false, true),
            vec![
                Step::CreateChangeRequest,
                Step::PollMergeability,
                Step::Merge,
                Step::CreateRelease,
                Step::UpdateVersionRecord,
                Step::Notify,
            ]
        );
    }

    #[test]
    fn test_atomic_merge_backend_skips_polling() {
        assert_eq!(
            walk(false, false),
            vec![
                Step::CreateChangeRequest,
                Step::Merge,
                Step::CreateRelease,
                Step::UpdateVersionRecord,
                Step::Notify,
            ]
        );
    }

    #[test]
    fn test_hotfix_path() {
        let expected = vec![Step::CreateRelease, Step::UpdateVersionRecord, Step::Notify];
        assert_eq!(walk(true, true), expected);
        assert_eq!(walk(true, false), expected);
    }

    #[test]
    fn test_actions() {
        assert_eq!(
            Step::CreateChangeRequest.action(Backend::GitHub),
            "Creating pull request"
        );
        assert_eq!(
            Step::PollMergeability.action(Backend::GitLab),
            "Checking merge request mergeability"
        );
        assert!(Step::Notify.is_post_release());
        assert!(!Step::CreateRelease.is_post_release());
    }
}
