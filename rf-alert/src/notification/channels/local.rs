//! Local command channel.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};

use super::NotificationChannel;
use crate::config::LocalCommandConfig;
use crate::notification::events::AlertOccurrence;
use crate::{Error, Result};

/// How long output readers may keep running after the command exited.
/// Background jobs started by the hook inherit its pipes.
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Runs the configured command with the alert code appended, and waits for it.
pub struct LocalCommandChannel {
    command: String,
    timeout: Duration,
}

impl LocalCommandChannel {
    /// `None` when no command is configured.
    pub fn from_config(config: &LocalCommandConfig) -> Option<Self> {
        config
            .command
            .as_ref()
            .map(|command| Self::new(command.clone(), config.timeout()))
    }

    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }

    fn command_line(&self, alert: &AlertOccurrence) -> String {
        process_utils::command_line(&self.command, [alert.code.to_string()])
    }
}

#[async_trait]
impl NotificationChannel for LocalCommandChannel {
    fn channel_type(&self) -> &'static str {
        "local"
    }

    fn target(&self) -> String {
        self.command.clone()
    }

    async fn send(&self, alert: &AlertOccurrence) -> Result<()> {
        let line = self.command_line(alert);
        info!("Executing local command: {}", line);

        let mut cmd = process_utils::tokio_shell_command(&line);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::Command(format!("failed to spawn '{}': {}", line, e)))?;

        let stdout_handle = child.stdout.take().map(|stdout| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("stdout: {}", line);
                }
            })
        });
        let stderr_handle = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("stderr: {}", line);
                }
            })
        });

        let readers: Vec<_> = [stdout_handle, stderr_handle].into_iter().flatten().collect();
        let result = tokio::time::timeout(self.timeout, child.wait()).await;

        let status = match result {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                readers.iter().for_each(|h| h.abort());
                return Err(Error::Command(format!("failed to wait for command: {}", e)));
            }
            Err(_) => {
                error!("Local command timed out after {}s", self.timeout.as_secs());
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill local command: {}", e);
                }
                readers.iter().for_each(|h| h.abort());
                return Err(Error::Command("command timed out".to_string()));
            }
        };

        for mut handle in readers {
            if tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, &mut handle)
                .await
                .is_err()
            {
                debug!("Output still open after exit, detaching readers");
                handle.abort();
            }
        }

        if !status.success() {
            return Err(Error::Command(format!(
                "'{}' exited with code {}",
                line,
                status.code().unwrap_or(-1)
            )));
        }

        debug!("Local command finished");
        Ok(())
    }
}
