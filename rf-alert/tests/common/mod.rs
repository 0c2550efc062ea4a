//! Shared fixtures: an in-process media host and recording mail transports.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{Value, json};

use rf_alert::notification::{MailMessage, MailTransport};
use rf_alert::{Error, Result};

pub const BASE_CONFIG: &str = r#"
[receiver]
gpio_pin = 27
poll_interval_ms = 1

[alert]
codes = [17, 42]
descriptions = ["front door", "garage"]
"#;

/// JSON-RPC requests received by a [`spawn_media_host`] server.
#[derive(Clone, Default)]
pub struct MediaHostLog(Arc<Mutex<Vec<Value>>>);

impl MediaHostLog {
    pub fn methods(&self) -> Vec<String> {
        self.0
            .lock()
            .iter()
            .filter_map(|call| call["method"].as_str().map(str::to_string))
            .collect()
    }

    pub fn calls(&self) -> Vec<Value> {
        self.0.lock().clone()
    }
}

async fn jsonrpc(State(log): State<MediaHostLog>, Json(body): Json<Value>) -> Json<Value> {
    let id = body["id"].clone();
    log.0.lock().push(body);
    Json(json!({"jsonrpc": "2.0", "id": id, "result": "OK"}))
}

/// Start a media host answering every call with `"OK"`.
pub async fn spawn_media_host() -> (SocketAddr, MediaHostLog) {
    let log = MediaHostLog::default();
    let app = Router::new()
        .route("/jsonrpc", post(jsonrpc))
        .with_state(log.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, log)
}

/// A localhost port nothing listens on.
pub async fn closed_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<MailMessage>>,
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        self.sent.lock().push(message.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct FailingMailer {
    pub attempts: Mutex<u32>,
}

#[async_trait]
impl MailTransport for FailingMailer {
    async fn send(&self, _message: &MailMessage) -> Result<()> {
        *self.attempts.lock() += 1;
        Err(Error::Mail("535 authentication failed".to_string()))
    }
}

pub fn mail_section(attach: Option<&std::path::Path>, wait_secs: u64) -> String {
    let attach = attach
        .map(|p| format!("attach = [{:?}]", p.display().to_string()))
        .unwrap_or_default();
    format!(
        r#"
[mail]
smtp_server = "smtp.example.com:587"
username = "pi@example.com"
password = "secret"
recipients = ["me@example.com"]
subject = "Alert: {{description}}"
body = "{{description}} was triggered"
time_format = "%H:%M"
attachment_wait_secs = {wait_secs}
{attach}
"#
    )
}
