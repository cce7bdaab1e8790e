//! Delivery targets for release notifications.

pub mod slack;

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::events::NotifyEvent;

/// A chat destination that accepts release messages.
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    /// Short identifier used in logs, e.g. `"slack"`.
    fn name(&self) -> &'static str;

    /// Whether a destination is configured. Disabled channels are skipped.
    fn enabled(&self) -> bool;

    /// Post the event text. Returns once the destination has answered.
    async fn send(&self, event: &NotifyEvent) -> Result<(), ChannelError>;
}
