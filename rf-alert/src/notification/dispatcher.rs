//! Alert fan-out.
//!
//! Every configured channel is attempted once per alert, strictly in order:
//! local command, each media host, then email. A channel's failure is
//! recorded in the [`DispatchReport`] and never stops the channels after it.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use tracing::{debug, error, info};

use super::channels::{
    EmailChannel, LocalCommandChannel, MailTransport, MediaHostChannel, NotificationChannel,
};
use super::events::{AlertOccurrence, ChannelOutcome, ChannelStatus, DispatchReport};
use crate::config::AppConfig;
use crate::domain::AlertCode;
use crate::listener::AlertHandler;

/// Sends one alert through every configured channel.
pub struct AlertDispatcher {
    config: Arc<AppConfig>,
    channels: Vec<Box<dyn NotificationChannel>>,
}

impl AlertDispatcher {
    /// Dispatcher with the production channels (SMTP for mail).
    pub fn new(config: Arc<AppConfig>) -> Self {
        let email = EmailChannel::from_config(config.mail.as_ref());
        Self::assemble(config, email)
    }

    /// Dispatcher that delivers mail through `transport` instead of SMTP.
    pub fn with_mail_transport(config: Arc<AppConfig>, transport: Arc<dyn MailTransport>) -> Self {
        let email = config
            .mail
            .clone()
            .map(|mail| EmailChannel::new(mail, transport));
        Self::assemble(config, email)
    }

    /// Dispatcher over an explicit channel list, attempted in the given order.
    pub fn with_channels(
        config: Arc<AppConfig>,
        channels: Vec<Box<dyn NotificationChannel>>,
    ) -> Self {
        Self { config, channels }
    }

    fn assemble(config: Arc<AppConfig>, email: Option<EmailChannel>) -> Self {
        let mut channels: Vec<Box<dyn NotificationChannel>> = Vec::new();

        if let Some(local) = LocalCommandChannel::from_config(&config.local) {
            channels.push(Box::new(local));
        }
        for host in MediaHostChannel::from_config(&config.media_hosts, &config.notification) {
            channels.push(Box::new(host));
        }
        if let Some(email) = email {
            channels.push(Box::new(email));
        }

        for channel in &channels {
            info!(
                "Added notification channel: {} ({})",
                channel.channel_type(),
                channel.target()
            );
        }

        Self { config, channels }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Fan `code` out to every channel and report what happened to each.
    pub async fn dispatch(&self, timestamp: DateTime<Local>, code: AlertCode) -> DispatchReport {
        let alert = AlertOccurrence {
            code,
            timestamp,
            description: self.config.alerts.description(code).map(str::to_string),
        };
        info!(
            code = %code,
            description = alert.description.as_deref().unwrap_or(""),
            "Dispatching alert"
        );

        let mut report = DispatchReport::new(code, timestamp);
        for channel in &self.channels {
            let status = match channel.send(&alert).await {
                Ok(()) => ChannelStatus::Delivered,
                Err(e) if e.is_unreachable() => {
                    debug!(
                        "{} channel {} skipped: {}",
                        channel.channel_type(),
                        channel.target(),
                        e
                    );
                    ChannelStatus::Skipped(e.to_string())
                }
                Err(e) => {
                    error!(
                        "{} channel {} failed: {}",
                        channel.channel_type(),
                        channel.target(),
                        e
                    );
                    ChannelStatus::Failed(e.to_string())
                }
            };
            report.push(ChannelOutcome {
                channel: channel.channel_type(),
                target: channel.target(),
                status,
            });
        }

        info!(
            code = %code,
            delivered = report.delivered(),
            failed = report.failures().count(),
            channels = report.outcomes.len(),
            "Alert dispatched"
        );
        match serde_json::to_string(&report) {
            Ok(json) => debug!(report = %json, "Dispatch report"),
            Err(e) => debug!("Dispatch report not serializable: {}", e),
        }
        report
    }
}

#[async_trait]
impl AlertHandler for AlertDispatcher {
    async fn on_alert(&self, code: AlertCode, timestamp: DateTime<Local>) {
        self.dispatch(timestamp, code).await;
    }
}
