//! Email channel.
//!
//! Builds one multipart message per alert (plain-text body plus any
//! harvested attachments) and hands it to a [`MailTransport`]. The default
//! transport is SMTP with STARTTLS and login.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info, warn};

use super::NotificationChannel;
use crate::config::MailConfig;
use crate::notification::attachments::AttachmentResolver;
use crate::notification::events::AlertOccurrence;
use crate::notification::template;
use crate::utils::fs;
use crate::{Error, Result};

/// Upper bound on one SMTP session.
const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// A binary attachment, named by its base filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAttachment {
    pub filename: String,
    pub content: Vec<u8>,
}

/// A fully rendered alert mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub from_name: Option<String>,
    pub from_address: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<MailAttachment>,
}

impl MailMessage {
    /// Build the MIME message.
    pub fn to_lettre(&self) -> Result<Message> {
        let from = Mailbox::new(self.from_name.clone(), self.from_address.parse()?);
        let mut builder = Message::builder().from(from).subject(self.subject.clone());
        for recipient in &self.to {
            builder = builder.to(Mailbox::new(None, recipient.parse()?));
        }

        let octet_stream = ContentType::parse("application/octet-stream")
            .map_err(|e| Error::Mail(e.to_string()))?;
        let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(self.body.clone()));
        for attachment in &self.attachments {
            parts = parts.singlepart(
                Attachment::new(attachment.filename.clone())
                    .body(attachment.content.clone(), octet_stream.clone()),
            );
        }

        Ok(builder.multipart(parts)?)
    }
}

/// Delivers a rendered mail.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<()>;
}

/// SMTP delivery with STARTTLS and login.
pub struct SmtpMailer {
    host: String,
    port: u16,
    username: String,
    password: String,
}

impl SmtpMailer {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
        }
    }

    /// `None` when the server address cannot be split into host and port.
    pub fn from_config(config: &MailConfig) -> Option<Self> {
        let (host, port) = config.smtp_endpoint()?;
        Some(Self::new(
            host,
            port,
            config.username.clone(),
            config.password.clone(),
        ))
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        let email = message.to_lettre()?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)?
            .port(self.port)
            .credentials(Credentials::new(
                self.username.clone(),
                self.password.clone(),
            ))
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        let response = transport.send(email).await?;
        debug!(
            server = %self.host,
            code = %response.code(),
            "SMTP server accepted message"
        );
        Ok(())
    }
}

/// Email channel: renders templates, resolves attachments, sends.
pub struct EmailChannel {
    config: MailConfig,
    resolver: AttachmentResolver,
    transport: Arc<dyn MailTransport>,
}

impl EmailChannel {
    pub fn new(config: MailConfig, transport: Arc<dyn MailTransport>) -> Self {
        let resolver = AttachmentResolver::new(config.attachment_wait(), config.attachment_poll());
        Self {
            config,
            resolver,
            transport,
        }
    }

    /// Channel backed by SMTP; `None` when mail is not configured.
    pub fn from_config(config: Option<&MailConfig>) -> Option<Self> {
        let config = config?;
        let mailer = SmtpMailer::from_config(config)?;
        Some(Self::new(config.clone(), Arc::new(mailer)))
    }

    /// Render the mail for `alert`, waiting for attachments if needed.
    pub async fn compose(&self, alert: &AlertOccurrence) -> MailMessage {
        let description = alert.description.as_deref();
        let timestamp = template::format_timestamp(&alert.timestamp, &self.config.time_format);

        let files = self.resolver.resolve(&self.config.attach).await;
        let mut attachments = Vec::with_capacity(files.len());
        for path in &files {
            if let Some(attachment) = load_attachment(path).await {
                attachments.push(attachment);
            }
        }

        MailMessage {
            from_name: self.config.realname.clone(),
            from_address: self.config.username.clone(),
            to: self.config.recipients.clone(),
            subject: template::render(&self.config.subject, description),
            body: template::render_body(&self.config.body, description, &timestamp),
            attachments,
        }
    }
}

async fn load_attachment(path: &Path) -> Option<MailAttachment> {
    if !tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
    {
        warn!("Attachment {} not found, skipping", path.display());
        return None;
    }
    let filename = path.file_name()?.to_string_lossy().into_owned();
    match fs::read_file(path).await {
        Ok(content) => Some(MailAttachment { filename, content }),
        Err(e) => {
            warn!("Skipping attachment: {}", e);
            None
        }
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn channel_type(&self) -> &'static str {
        "email"
    }

    fn target(&self) -> String {
        self.config.smtp_server.clone()
    }

    async fn send(&self, alert: &AlertOccurrence) -> Result<()> {
        let message = self.compose(alert).await;
        info!(
            recipients = message.to.len(),
            attachments = message.attachments.len(),
            "Sending alert mail '{}'",
            message.subject
        );
        self.transport.send(&message).await
    }
}
