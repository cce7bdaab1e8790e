//! Notification events for release runs.

use serde::{Deserialize, Serialize};

/// Events that can trigger notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotifyEvent {
    /// A release was cut after merging its change request
    ReleaseCreated {
        repository: String,
        version: String,
        provider: String,
        #[serde(default)]
        body: String,
    },

    /// A release was cut straight from the base branch
    HotfixCreated {
        repository: String,
        version: String,
        provider: String,
        #[serde(default)]
        body: String,
    },
}

impl NotifyEvent {
    /// Get a short title for this event type.
    #[must_use]
    pub fn title(&self) -> String {
        match self {
            Self::ReleaseCreated {
                repository,
                version,
                provider,
                ..
            } => format!("Released {repository} version {version} on {provider}"),
            Self::HotfixCreated {
                repository,
                version,
                provider,
                ..
            } => format!("Hotfix: Released {repository} version {version} on {provider}"),
        }
    }

    /// Plain-text message: the title, then the release notes if any.
    #[must_use]
    pub fn text(&self) -> String {
        let body = match self {
            Self::ReleaseCreated { body, .. } | Self::HotfixCreated { body, .. } => body.trim(),
        };
        if body.is_empty() {
            self.title()
        } else {
            format!("{}\n\n{body}", self.title())
        }
    }
}
