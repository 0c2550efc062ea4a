//! Configuration file sections.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::AlertCode;

pub const DEFAULT_ADDON_ID: &str = "script.securitycam";
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Radio receiver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiverConfig {
    /// BCM number of the GPIO pin wired to the receiver's data line.
    pub gpio_pin: u8,
    /// Poll interval of the listener loop in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    10
}

impl ReceiverConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Alert codes and their descriptions, as written in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertSection {
    pub codes: Vec<AlertCode>,
    pub descriptions: Vec<String>,
}

/// Media center hosts reachable over JSON-RPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaHostsConfig {
    #[serde(default)]
    pub hosts: Vec<String>,
    #[serde(default = "default_media_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Addon executed on every live host; `None` disables the trigger.
    #[serde(default = "default_addon_id")]
    pub addon_id: Option<String>,
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_display_time")]
    pub display_time_ms: u64,
}

fn default_media_port() -> u16 {
    8080
}

fn default_addon_id() -> Option<String> {
    Some(DEFAULT_ADDON_ID.to_string())
}

fn default_probe_timeout() -> u64 {
    3
}

fn default_request_timeout() -> u64 {
    10
}

fn default_display_time() -> u64 {
    2000
}

impl Default for MediaHostsConfig {
    fn default() -> Self {
        Self {
            hosts: Vec::new(),
            port: default_media_port(),
            username: None,
            password: None,
            addon_id: default_addon_id(),
            probe_timeout_secs: default_probe_timeout(),
            request_timeout_secs: default_request_timeout(),
            display_time_ms: default_display_time(),
        }
    }
}

impl MediaHostsConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Basic-auth credentials, present only when both halves are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) => Some((user, pass)),
            _ => None,
        }
    }
}

/// Templates for the on-screen notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationTemplates {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl NotificationTemplates {
    /// Both title and text must be set for a notification to be sent.
    pub fn both(&self) -> Option<(&str, &str)> {
        match (self.title.as_deref(), self.text.as_deref()) {
            (Some(title), Some(text)) => Some((title, text)),
            _ => None,
        }
    }
}

/// SMTP account and alert mail settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailConfig {
    /// `host[:port]`; blank disables mail.
    #[serde(default)]
    pub smtp_server: String,
    #[serde(default)]
    pub realname: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    /// Either one directory to harvest or a list of literal files.
    #[serde(default)]
    pub attach: Vec<PathBuf>,
    #[serde(default = "default_time_format")]
    pub time_format: String,
    #[serde(default = "default_attachment_wait")]
    pub attachment_wait_secs: u64,
    #[serde(default = "default_attachment_poll")]
    pub attachment_poll_ms: u64,
}

fn default_time_format() -> String {
    DEFAULT_TIME_FORMAT.to_string()
}

fn default_attachment_wait() -> u64 {
    10
}

fn default_attachment_poll() -> u64 {
    1000
}

impl MailConfig {
    /// Split `smtp_server` into host and port.
    pub fn smtp_endpoint(&self) -> Option<(String, u16)> {
        let server = self.smtp_server.trim();
        if server.is_empty() {
            return None;
        }
        match server.rsplit_once(':') {
            Some((host, port)) => port.parse().ok().map(|p| (host.to_string(), p)),
            None => Some((server.to_string(), DEFAULT_SMTP_PORT)),
        }
    }

    pub fn attachment_wait(&self) -> Duration {
        Duration::from_secs(self.attachment_wait_secs)
    }

    pub fn attachment_poll(&self) -> Duration {
        Duration::from_millis(self.attachment_poll_ms.max(1))
    }
}

/// Local hook run before any remote channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalCommandConfig {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default = "default_command_timeout")]
    pub timeout_secs: u64,
}

fn default_command_timeout() -> u64 {
    300
}

impl Default for LocalCommandConfig {
    fn default() -> Self {
        Self {
            command: None,
            timeout_secs: default_command_timeout(),
        }
    }
}

impl LocalCommandConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Whole configuration file as deserialized, before validation.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawConfig {
    pub receiver: ReceiverConfig,
    pub alert: AlertSection,
    #[serde(default)]
    pub media_hosts: MediaHostsConfig,
    #[serde(default)]
    pub notification: NotificationTemplates,
    #[serde(default)]
    pub mail: Option<MailConfig>,
    #[serde(default)]
    pub local: LocalCommandConfig,
}
