//! Backup and restore of the installed plugin file around a swap.
//!
//! Before the sequencer overwrites the installed file it copies the current
//! content to a `.backup` sibling. A failed write then restores the old
//! bytes instead of leaving a truncated file for the host's loader to choke
//! on. The backup is removed once a cycle completes.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::constants::BACKUP_SUFFIX;

/// Manages the pre-write backup of one installed plugin file.
pub struct BackupManager {
    original_path: PathBuf,
    backup_path: PathBuf,
}

impl BackupManager {
    /// Create a manager for the installed file at `path`.
    ///
    /// The backup lives next to the original with a `.backup` suffix, so it
    /// stays on the same file system and restore is a plain copy.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let original_path = path.into();
        let mut name = original_path.file_name().unwrap_or_default().to_os_string();
        name.push(".");
        name.push(BACKUP_SUFFIX);
        let backup_path = original_path.with_file_name(name);

        Self {
            original_path,
            backup_path,
        }
    }

    /// Copy the installed file to the backup location.
    ///
    /// Replaces any stale backup from an earlier cycle.
    pub async fn create_backup(&self) -> Result<()> {
        if !self.original_path.exists() {
            bail!("Original file does not exist: {}", self.original_path.display());
        }

        if self.backup_path.exists() {
            debug!("removing stale backup at {}", self.backup_path.display());
            fs::remove_file(&self.backup_path)
                .await
                .context("Failed to remove stale backup")?;
        }

        debug!("creating backup at {}", self.backup_path.display());
        fs::copy(&self.original_path, &self.backup_path)
            .await
            .context("Failed to create backup")?;

        Ok(())
    }

    /// Restore the installed file from the backup.
    pub async fn restore_backup(&self) -> Result<()> {
        if !self.backup_path.exists() {
            bail!("No backup found at {}", self.backup_path.display());
        }

        warn!("restoring installed file from {}", self.backup_path.display());

        if self.original_path.exists() {
            fs::remove_file(&self.original_path)
                .await
                .context("Failed to remove damaged file before restore")?;
        }

        fs::copy(&self.backup_path, &self.original_path)
            .await
            .context("Failed to restore backup")?;

        info!("restored {} from backup", self.original_path.display());
        Ok(())
    }

    /// Remove the backup after a completed cycle.
    ///
    /// Silently succeeds when no backup exists, so it is safe to call
    /// unconditionally during cleanup.
    pub async fn cleanup_backup(&self) -> Result<()> {
        if self.backup_path.exists() {
            debug!("removing backup at {}", self.backup_path.display());
            fs::remove_file(&self.backup_path)
                .await
                .context("Failed to remove backup")?;
        }
        Ok(())
    }

    /// Whether a backup file currently exists.
    #[must_use]
    pub fn backup_exists(&self) -> bool {
        self.backup_path.exists()
    }

    /// Where the backup is stored.
    #[must_use]
    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_backup_restore_cycle() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("pawprint.plugin.js");
        fs::write(&file, b"original content").await.unwrap();

        let manager = BackupManager::new(&file);
        assert!(!manager.backup_exists());

        manager.create_backup().await.unwrap();
        assert!(manager.backup_exists());

        fs::write(&file, b"damaged content").await.unwrap();
        manager.restore_backup().await.unwrap();
        assert_eq!(fs::read(&file).await.unwrap(), b"original content");

        manager.cleanup_backup().await.unwrap();
        assert!(!manager.backup_exists());
    }

    #[tokio::test]
    async fn test_backup_missing_original() {
        let temp = TempDir::new().unwrap();
        let manager = BackupManager::new(temp.path().join("absent.js"));
        assert!(manager.create_backup().await.is_err());
    }

    #[tokio::test]
    async fn test_restore_without_backup() {
        let temp = TempDir::new().unwrap();
        let manager = BackupManager::new(temp.path().join("absent.js"));
        assert!(manager.restore_backup().await.is_err());
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let manager = BackupManager::new(temp.path().join("absent.js"));
        manager.cleanup_backup().await.unwrap();
    }

    #[test]
    fn test_backup_path_shape() {
        let manager = BackupManager::new("/plugins/pawprint.plugin.js");
        assert_eq!(
            manager.backup_path(),
            Path::new("/plugins/pawprint.plugin.js.backup")
        );
    }
}
