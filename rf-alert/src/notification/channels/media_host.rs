//! Media center host channel (JSON-RPC over HTTP).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use super::NotificationChannel;
use crate::config::{MediaHostsConfig, NotificationTemplates};
use crate::notification::events::AlertOccurrence;
use crate::notification::template;
use crate::utils::http_client;
use crate::{Error, Result};

/// Remote procedure calls sent to a media host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum MediaHostRequest {
    /// Show an on-screen notification.
    #[serde(rename = "GUI.ShowNotification")]
    ShowNotification {
        title: String,
        message: String,
        displaytime: u64,
    },
    /// Start an addon.
    #[serde(rename = "Addons.ExecuteAddon")]
    ExecuteAddon { addonid: String },
}

impl MediaHostRequest {
    pub fn method(&self) -> &'static str {
        match self {
            Self::ShowNotification { .. } => "GUI.ShowNotification",
            Self::ExecuteAddon { .. } => "Addons.ExecuteAddon",
        }
    }
}

/// JSON-RPC 2.0 envelope around a [`MediaHostRequest`].
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    #[serde(flatten)]
    call: &'a MediaHostRequest,
    id: u64,
}

impl<'a> JsonRpcRequest<'a> {
    pub fn new(call: &'a MediaHostRequest, id: u64) -> Self {
        Self {
            jsonrpc: "2.0",
            call,
            id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// One media host: liveness probe, then notification and addon trigger.
pub struct MediaHostChannel {
    host: String,
    port: u16,
    client: Client,
    credentials: Option<(String, String)>,
    templates: NotificationTemplates,
    addon_id: Option<String>,
    probe_timeout: Duration,
    display_time_ms: u64,
    next_id: AtomicU64,
}

impl MediaHostChannel {
    /// Build one channel per configured host, in configured order.
    pub fn from_config(
        config: &MediaHostsConfig,
        templates: &NotificationTemplates,
    ) -> Vec<Self> {
        let client = http_client::build_rpc_client(config.request_timeout());
        config
            .hosts
            .iter()
            .map(|host| Self {
                host: host.clone(),
                port: config.port,
                client: client.clone(),
                credentials: config
                    .credentials()
                    .map(|(u, p)| (u.to_string(), p.to_string())),
                templates: templates.clone(),
                addon_id: config.addon_id.clone(),
                probe_timeout: config.probe_timeout(),
                display_time_ms: config.display_time_ms,
                next_id: AtomicU64::new(1),
            })
            .collect()
    }

    fn url(&self) -> String {
        if self.host.contains(':') {
            format!("http://[{}]:{}/jsonrpc", self.host, self.port)
        } else {
            format!("http://{}:{}/jsonrpc", self.host, self.port)
        }
    }

    /// Best-effort liveness check: can a TCP connection be opened in time?
    pub async fn is_up(&self) -> bool {
        matches!(
            tokio::time::timeout(
                self.probe_timeout,
                TcpStream::connect((self.host.as_str(), self.port))
            )
            .await,
            Ok(Ok(_))
        )
    }

    /// The requests to send for `alert`, in order.
    pub fn requests_for(&self, alert: &AlertOccurrence) -> Vec<MediaHostRequest> {
        let mut requests = Vec::with_capacity(2);
        if let Some((title, text)) = self.templates.both() {
            requests.push(MediaHostRequest::ShowNotification {
                title: title.to_string(),
                message: template::render(text, alert.description.as_deref()),
                displaytime: self.display_time_ms,
            });
        }
        if let Some(addon_id) = &self.addon_id {
            requests.push(MediaHostRequest::ExecuteAddon {
                addonid: addon_id.clone(),
            });
        }
        requests
    }

    /// Send one request; succeeds only if the host answers `"result": "OK"`.
    pub async fn call(&self, request: &MediaHostRequest) -> Result<()> {
        let method = request.method();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut builder = self
            .client
            .post(self.url())
            .json(&JsonRpcRequest::new(request, id));
        if let Some((username, password)) = &self.credentials {
            builder = builder.basic_auth(username, Some(password));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::rpc(method, e.to_string()))?;
        let status = response.status();
        let payload: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| Error::rpc(method, format!("malformed response ({status}): {e}")))?;

        match (&payload.result, &payload.error) {
            (Some(Value::String(result)), _) if result == "OK" => Ok(()),
            (_, Some(error)) => Err(Error::rpc(method, format!("host returned error {error}"))),
            (result, None) => Err(Error::rpc(
                method,
                format!("unexpected result {}", result.clone().unwrap_or(Value::Null)),
            )),
        }
    }
}

#[async_trait]
impl NotificationChannel for MediaHostChannel {
    fn channel_type(&self) -> &'static str {
        "media_host"
    }

    fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    async fn send(&self, alert: &AlertOccurrence) -> Result<()> {
        if !self.is_up().await {
            debug!("Host {} is down. Requests canceled.", self.host);
            return Err(Error::HostUnreachable {
                host: self.host.clone(),
                port: self.port,
            });
        }

        // Each request is attempted regardless of the previous one's outcome.
        let mut first_failure = None;
        for request in self.requests_for(alert) {
            debug!(
                host = %self.host,
                method = request.method(),
                "Requesting {:?} from host {}",
                request,
                self.host
            );
            if let Err(e) = self.call(&request).await {
                warn!(host = %self.host, "{}", e);
                first_failure.get_or_insert(e);
            }
        }

        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
