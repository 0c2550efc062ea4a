//! Attachment resolution with a bounded wait.
//!
//! Cameras usually drop their snapshot into a directory a moment after the
//! sensor fires, so a configured directory is polled until it holds a file.

use std::path::PathBuf;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::utils::fs;

/// Default upper bound on the wait for a directory to receive a file.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(10);

/// Default delay between two directory scans.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Turns configured attachment entries into the files to attach.
#[derive(Debug, Clone, Copy)]
pub struct AttachmentResolver {
    max_wait: Duration,
    poll_interval: Duration,
}

impl Default for AttachmentResolver {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WAIT, DEFAULT_POLL_INTERVAL)
    }
}

impl AttachmentResolver {
    pub fn new(max_wait: Duration, poll_interval: Duration) -> Self {
        Self {
            max_wait,
            poll_interval,
        }
    }

    /// Resolve `entries` into an ordered list of file paths.
    ///
    /// If the first entry is a directory, poll it until it contains at least
    /// one regular file or `max_wait` elapses, then return its regular files
    /// (non-recursive, listing order). An empty directory yields an empty
    /// list. Otherwise `entries` are returned as-is; existence is checked
    /// when the mail is built.
    pub async fn resolve(&self, entries: &[PathBuf]) -> Vec<PathBuf> {
        let Some(first) = entries.first() else {
            return Vec::new();
        };
        if !fs::is_dir(first).await {
            return entries.to_vec();
        }

        let started = Instant::now();
        loop {
            match fs::list_regular_files(first).await {
                Ok(files) if !files.is_empty() => {
                    debug!(
                        dir = %first.display(),
                        count = files.len(),
                        waited_ms = started.elapsed().as_millis() as u64,
                        "Attachment directory ready"
                    );
                    return files;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "Failed to scan attachment directory");
                    return Vec::new();
                }
            }

            if started.elapsed() >= self.max_wait {
                debug!(dir = %first.display(), "No attachment appeared before the wait expired");
                return Vec::new();
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
