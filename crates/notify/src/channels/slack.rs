//! Slack incoming-webhook notification channel.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ChannelError;
use crate::events::NotifyEvent;
use crate::NotifyChannel;

/// Environment variable for Slack webhook URL.
const ENV_SLACK_WEBHOOK_URL: &str = "SLACK_WEBHOOK_URL";

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Slack webhook notification channel.
pub struct SlackChannel {
    webhook_url: Option<String>,
    client: reqwest::Client,
}

impl SlackChannel {
    /// Create a new Slack channel from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Http`] if the HTTP client cannot be built.
    pub fn from_env() -> Result<Self, ChannelError> {
        let webhook_url = std::env::var(ENV_SLACK_WEBHOOK_URL)
            .ok()
            .filter(|url| !url.trim().is_empty());

        if webhook_url.is_some() {
            debug!("Slack notifications enabled");
        } else {
            debug!("Slack notifications disabled (SLACK_WEBHOOK_URL not set)");
        }

        Ok(Self {
            webhook_url,
            client: http_client()?,
        })
    }

    /// Create a Slack channel with a specific webhook URL.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Http`] if the HTTP client cannot be built.
    pub fn new(webhook_url: String) -> Result<Self, ChannelError> {
        Ok(Self {
            webhook_url: Some(webhook_url),
            client: http_client()?,
        })
    }
}

fn http_client() -> Result<reqwest::Client, ChannelError> {
    Ok(reqwest::Client::builder().timeout(SEND_TIMEOUT).build()?)
}

#[async_trait]
impl NotifyChannel for SlackChannel {
    fn name(&self) -> &'static str {
        "slack"
    }

    fn enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    async fn send(&self, event: &NotifyEvent) -> Result<(), ChannelError> {
        let webhook_url = self
            .webhook_url
            .as_ref()
            .ok_or_else(|| ChannelError::NotConfigured(ENV_SLACK_WEBHOOK_URL.to_string()))?;

        let payload = SlackPayload { text: event.text() };

        debug!(channel = "slack", event_type = ?event.title(), "Sending notification");

        let response = self.client.post(webhook_url).json(&payload).send().await?;

        if response.status().is_success() {
            debug!(channel = "slack", "Notification sent successfully");
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            warn!(
                channel = "slack",
                status = %status,
                body = %body,
                "Slack webhook request failed"
            );

            Err(ChannelError::Rejected {
                channel: "slack",
                status: status.as_u16(),
                body,
            })
        }
    }
}

/// Incoming-webhook payload; plain text only.
#[derive(Debug, Serialize)]
struct SlackPayload {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_channel_is_disabled() {
        let channel = SlackChannel {
            webhook_url: None,
            client: http_client().unwrap(),
        };
        assert!(!channel.enabled());
        assert_eq!(channel.name(), "slack");
    }

    #[tokio::test]
    async fn test_send_without_url_fails() {
        let channel = SlackChannel {
            webhook_url: None,
            client: http_client().unwrap(),
        };
        let event = NotifyEvent::ReleaseCreated {
            repository: "svc".to_string(),
            version: "v1.0.0".to_string(),
            provider: "GitHub".to_string(),
            body: String::new(),
        };
        let err = channel.send(&event).await.unwrap_err();
        assert!(matches!(err, ChannelError::NotConfigured(_)));
    }

    #[test]
    fn test_new_builds_enabled_channel() {
        let channel = SlackChannel::new("https://hooks.slack.test/T000".to_string()).unwrap();
        assert!(channel.enabled());
        assert_eq!(
            channel.webhook_url.as_deref(),
            Some("https://hooks.slack.test/T000")
        );
    }
}
