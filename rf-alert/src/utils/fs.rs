//! Filesystem helpers shared across modules.
//!
//! These helpers attach the operation and path to IO errors so log lines
//! say which attachment or log file was involved.

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Convert an IO error into an application error with operation + path context.
pub fn io_error(op: &'static str, path: &Path, source: std::io::Error) -> Error {
    Error::io_path(op, path, source)
}

/// Whether `path` is an existing directory.
pub async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

/// List the regular files directly inside `dir`, in directory-listing order.
///
/// Subdirectories are not descended into. Symlinks count when they resolve to
/// a regular file.
pub async fn list_regular_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| io_error("listing directory", dir, e))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| io_error("listing directory", dir, e))?
    {
        let path = entry.path();
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => files.push(path),
            _ => {}
        }
    }
    Ok(files)
}

/// Read a whole file, tagging errors with the path.
pub async fn read_file(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|e| io_error("reading attachment", path, e))
}

/// Ensure the parent directory of a file path exists (synchronous variant).
pub fn ensure_parent_dir_sync(path: &Path) -> Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|e| io_error("creating log directory", parent, e))
}
