//! Configuration loading and validation.
//!
//! The configuration is read once at startup from a TOML file, validated, and
//! then shared read-only as `Arc<AppConfig>` by the listener and dispatcher.

mod sections;
mod validate;

pub use sections::{
    DEFAULT_ADDON_ID, DEFAULT_SMTP_PORT, DEFAULT_TIME_FORMAT, LocalCommandConfig, MailConfig,
    MediaHostsConfig, NotificationTemplates, ReceiverConfig,
};
pub use validate::{is_hostname, is_mail_address};

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::domain::AlertCatalog;
use crate::{Error, Result};
use sections::RawConfig;
use validate::non_blank;

/// Configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "rf-alert.toml";

/// Validated, immutable application configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub receiver: ReceiverConfig,
    pub alerts: AlertCatalog,
    pub media_hosts: MediaHostsConfig,
    pub notification: NotificationTemplates,
    /// `None` when no SMTP server is configured.
    pub mail: Option<MailConfig>,
    pub local: LocalCommandConfig,
}

impl AppConfig {
    /// Load and validate the configuration.
    ///
    /// With no explicit path, `rf-alert.toml` in the working directory is
    /// tried first, then `<config dir>/rf-alert/config.toml`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = resolve_path(path)?;
        info!(path = %path.display(), "Reading configuration");

        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::config(format!("cannot read {}: {e}", path.display())))?;
        let config = Self::from_toml_str(&content)?;

        info!("Configuration OK");
        Ok(config)
    }

    /// Parse and validate configuration text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: RawConfig =
            toml::from_str(content).map_err(|e| Error::config(e.to_string()))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let alerts = AlertCatalog::new(
            raw.alert.codes,
            raw.alert.descriptions.into_iter().map(|d| d.trim().to_string()).collect(),
        )
        .map_err(|e| Error::config(format!("[alert] {e}")))?;

        let media_hosts = normalize_media_hosts(raw.media_hosts)?;
        let notification = NotificationTemplates {
            title: non_blank(raw.notification.title),
            text: non_blank(raw.notification.text),
        };
        let mail = match raw.mail {
            Some(mail) if !mail.smtp_server.trim().is_empty() => Some(normalize_mail(mail)?),
            _ => None,
        };
        let local = LocalCommandConfig {
            command: non_blank(raw.local.command),
            timeout_secs: raw.local.timeout_secs,
        };

        debug!(
            codes = alerts.len(),
            hosts = media_hosts.hosts.len(),
            mail = mail.is_some(),
            local = local.command.is_some(),
            "Configuration validated"
        );

        Ok(Self {
            receiver: raw.receiver,
            alerts,
            media_hosts,
            notification,
            mail,
            local,
        })
    }

    /// Override the addon triggered on media hosts; a blank id disables it.
    pub fn with_addon_id(mut self, addon_id: Option<String>) -> Self {
        if let Some(id) = addon_id {
            self.media_hosts.addon_id = non_blank(Some(id));
        }
        self
    }
}

fn resolve_path(path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = path {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(Error::config(format!(
            "could not find configuration file '{}'",
            path.display()
        )));
    }

    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.exists() {
        return Ok(local);
    }

    if let Some(dir) = dirs::config_dir() {
        let candidate = dir.join("rf-alert").join("config.toml");
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(Error::config(format!(
        "could not find configuration file '{DEFAULT_CONFIG_FILE}'"
    )))
}

fn normalize_media_hosts(mut hosts: MediaHostsConfig) -> Result<MediaHostsConfig> {
    hosts.hosts = hosts
        .hosts
        .into_iter()
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .collect();

    if let Some(bad) = hosts.hosts.iter().find(|h| !is_hostname(h)) {
        return Err(Error::config(format!("[media_hosts] invalid host name '{bad}'")));
    }
    if hosts.port == 0 {
        return Err(Error::config("[media_hosts] port must be between 1 and 65535"));
    }

    hosts.username = non_blank(hosts.username);
    hosts.password = non_blank(hosts.password);
    hosts.addon_id = non_blank(hosts.addon_id);
    Ok(hosts)
}

fn normalize_mail(mut mail: MailConfig) -> Result<MailConfig> {
    mail.smtp_server = mail.smtp_server.trim().to_string();
    mail.username = mail.username.trim().to_string();
    mail.realname = non_blank(mail.realname);
    mail.subject = mail.subject.trim().to_string();
    mail.body = mail.body.trim().to_string();
    mail.recipients = mail
        .recipients
        .into_iter()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect();
    mail.attach.retain(|p| !p.as_os_str().is_empty());
    if mail.time_format.trim().is_empty() {
        mail.time_format = DEFAULT_TIME_FORMAT.to_string();
    }

    match mail.smtp_endpoint() {
        Some((host, _)) if is_hostname(&host) => {}
        _ => {
            return Err(Error::config(format!(
                "[mail] invalid smtp_server '{}'",
                mail.smtp_server
            )));
        }
    }
    if !is_mail_address(&mail.username) || mail.password.is_empty() {
        return Err(Error::config(
            "[mail] username must be a mail address and password must be set",
        ));
    }
    if mail.recipients.is_empty() {
        return Err(Error::config("[mail] at least one recipient is required"));
    }
    if let Some(bad) = mail.recipients.iter().find(|r| !is_mail_address(r)) {
        return Err(Error::config(format!("[mail] invalid recipient '{bad}'")));
    }
    if mail.subject.is_empty() || mail.body.is_empty() {
        return Err(Error::config("[mail] subject and body must be set"));
    }
    Ok(mail)
}
