//! Safe file operations for the managed plugin paths.
//!
//! The installed plugin file must never be observable in a half-written
//! state: the host's loader may re-read it at any moment once it is enabled
//! again. Writes therefore go through a write-then-rename strategy - content
//! lands in a `.tmp` sibling, is synced, and is renamed over the target in
//! one step.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Ensure a directory exists, creating it and its parents if needed.
pub async fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .await
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    } else if !path.is_dir() {
        anyhow::bail!("Path exists but is not a directory: {}", path.display());
    }
    Ok(())
}

/// Atomically write bytes to a file using a write-then-rename strategy.
///
/// 1. Write content to a `.tmp` sibling of the target
/// 2. Sync the temporary file to disk
/// 3. Rename it over the target path
///
/// Readers never see a partially written file: the target either holds the
/// old content or the new content.
pub async fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        ensure_dir(parent).await?;
    }

    let temp_path = temp_sibling(path);

    {
        let mut file = fs::File::create(&temp_path)
            .await
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;
        file.write_all(content)
            .await
            .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;
        file.sync_all()
            .await
            .with_context(|| format!("Failed to sync temp file: {}", temp_path.display()))?;
    }

    if let Err(e) = fs::rename(&temp_path, path).await {
        // Don't leave the temp file behind on a failed rename.
        let _ = fs::remove_file(&temp_path).await;
        return Err(e).with_context(|| {
            format!(
                "Failed to move {} into place at {}",
                temp_path.display(),
                path.display()
            )
        });
    }

    Ok(())
}

/// Atomically write a string to a file.
///
/// Convenience wrapper around [`atomic_write`].
pub async fn safe_write(path: &Path, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes()).await
}

/// Read a file to a string with path context on failure.
pub async fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// Remove a file if it exists; returns whether anything was removed.
pub async fn remove_if_exists(path: &Path) -> Result<bool> {
    if path.exists() {
        fs::remove_file(path)
            .await
            .with_context(|| format!("Failed to remove {}", path.display()))?;
        Ok(true)
    } else {
        Ok(false)
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
