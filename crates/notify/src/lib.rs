//! Release notifications.
//!
//! This crate delivers a plain-text status message to chat channels after a
//! release has been cut.
//!
//! # Usage
//!
//! ```no_run
//! use notify::{Notifier, NotifyEvent};
//!
//! # async fn example() {
//! // Create notifier from environment variables
//! let notifier = Notifier::from_env();
//!
//! let result = notifier
//!     .deliver(&NotifyEvent::ReleaseCreated {
//!         repository: "billing-api".to_string(),
//!         version: "v1.4.0".to_string(),
//!         provider: "GitHub".to_string(),
//!         body: "Release notes".to_string(),
//!     })
//!     .await;
//! # }
//! ```
//!
//! # Configuration
//!
//! The notifier is configured via environment variables:
//!
//! - `SLACK_WEBHOOK_URL`: Slack incoming webhook URL (enables Slack channel)
//! - `NOTIFY_DISABLED`: Set to "true" to disable all notifications

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod channels;
pub mod error;
pub mod events;

pub use channels::slack::SlackChannel;
pub use channels::NotifyChannel;
pub use error::ChannelError;
pub use events::NotifyEvent;

use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Environment variable to disable all notifications.
const ENV_NOTIFY_DISABLED: &str = "NOTIFY_DISABLED";

/// Central notification dispatcher.
///
/// The `Notifier` holds every configured channel and delivers each event to
/// all of them in turn.
pub struct Notifier {
    channels: Vec<Arc<dyn NotifyChannel>>,
    disabled: bool,
}

impl Notifier {
    /// Create a new notifier from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let disabled = std::env::var(ENV_NOTIFY_DISABLED)
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        if disabled {
            info!("Notifications disabled via NOTIFY_DISABLED");
            return Self::disabled();
        }

        let mut channels: Vec<Arc<dyn NotifyChannel>> = vec![];

        match SlackChannel::from_env() {
            Ok(slack) if slack.enabled() => {
                info!("Slack notifications enabled");
                channels.push(Arc::new(slack));
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "Failed to build Slack channel, skipping"),
        }

        if channels.is_empty() {
            warn!("No notification channels configured");
        } else {
            info!(
                channel_count = channels.len(),
                "Notification system initialized"
            );
        }

        Self {
            channels,
            disabled: false,
        }
    }

    /// Create a notifier with specific channels.
    #[must_use]
    pub fn with_channels(channels: Vec<Arc<dyn NotifyChannel>>) -> Self {
        Self {
            channels,
            disabled: false,
        }
    }

    /// Create a disabled notifier (for testing or when notifications are off).
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            channels: vec![],
            disabled: true,
        }
    }

    /// Check if any notification channels are enabled.
    #[must_use]
    pub fn has_channels(&self) -> bool {
        self.channel_count() > 0
    }

    /// Get the number of enabled channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        if self.disabled {
            0
        } else {
            self.channels.iter().filter(|c| c.enabled()).count()
        }
    }

    /// Send `event` to every enabled channel and wait for each to finish.
    ///
    /// Every channel is tried even if an earlier one fails.
    ///
    /// # Errors
    ///
    /// Returns the first channel error encountered.
    pub async fn deliver(&self, event: &NotifyEvent) -> Result<(), ChannelError> {
        if self.disabled {
            debug!("Notifications disabled, skipping event");
            return Ok(());
        }

        let mut first_error = None;

        for channel in &self.channels {
            let channel_name = channel.name();

            if !channel.enabled() {
                debug!(channel = channel_name, "Channel disabled, skipping");
                continue;
            }

            match channel.send(event).await {
                Ok(()) => {
                    debug!(channel = channel_name, "Notification sent");
                }
                Err(e) => {
                    error!(
                        channel = channel_name,
                        error = %e,
                        "Failed to send notification"
                    );
                    first_error.get_or_insert(e);
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::from_env()
    }
}
