//! Two-stage shutdown driven by process signals.
//!
//! The first Ctrl-C or SIGTERM asks the listener to stop between polls. A
//! second one aborts an in-flight dispatch; the receiver is still released.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    graceful: CancellationToken,
    forced: CancellationToken,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancelled on the first request.
    pub fn graceful(&self) -> CancellationToken {
        self.graceful.clone()
    }

    /// Cancelled on the second request.
    pub fn forced(&self) -> CancellationToken {
        self.forced.clone()
    }

    /// Escalate one stage.
    pub fn request(&self) {
        if self.graceful.is_cancelled() {
            warn!("Second interrupt, aborting current dispatch");
            self.forced.cancel();
        } else {
            info!("Abort requested by user or system");
            self.graceful.cancel();
        }
    }

    /// Spawn a task that escalates on every Ctrl-C or SIGTERM.
    pub fn watch_signals(&self) {
        let shutdown = self.clone();
        tokio::spawn(async move {
            while !shutdown.forced.is_cancelled() {
                if let Err(e) = wait_for_signal().await {
                    warn!("Failed to listen for shutdown signals: {}", e);
                    return;
                }
                shutdown.request();
            }
        });
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
