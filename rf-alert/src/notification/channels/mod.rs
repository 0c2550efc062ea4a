//! Notification channels.
//!
//! This module provides the channels an alert is fanned out to:
//! - Local shell command
//! - Media center hosts (JSON-RPC notification + addon trigger)
//! - Email (SMTP)

mod email;
mod local;
mod media_host;

pub use email::{EmailChannel, MailAttachment, MailMessage, MailTransport, SmtpMailer};
pub use local::LocalCommandChannel;
pub use media_host::{JsonRpcRequest, MediaHostChannel, MediaHostRequest};

use async_trait::async_trait;

use super::events::AlertOccurrence;
use crate::Result;

/// Trait for notification channels.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Get the channel type name.
    fn channel_type(&self) -> &'static str;

    /// Human-readable target (host, command, mail server) for logs and reports.
    fn target(&self) -> String;

    /// Deliver one alert through this channel.
    ///
    /// `Error::HostUnreachable` means the channel was skipped, any other
    /// error means it failed.
    async fn send(&self, alert: &AlertOccurrence) -> Result<()>;
}
