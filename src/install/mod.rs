//! Installed-plugin inspection and the JSON version sidecar.
//!
//! The installed plugin is one source file in the host's plugins directory.
//! Its version comes from the same documentation-comment marker the remote
//! source carries; when the file has no marker (hand-edited, truncated, or a
//! variant that never carried one) the optional JSON sidecar is consulted as
//! a fallback record of the last installed version.
//!
//! A local version that cannot be determined from either place is not an
//! error: the caller treats the comparison as indeterminate and skips the
//! cycle rather than guessing.

use crate::constants::SIDECAR_SUFFIX;
use crate::core::ReplugError;
use crate::utils::fs as fsutil;
use crate::version::{VersionString, marker};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Sidecar record of the last installed version.
///
/// Serialized as JSON next to the installed file
/// (`<plugin file>.version.json`). The record is advisory: the marker in the
/// installed file always wins when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionRecord {
    /// The version that was installed.
    pub version: String,
    /// UTC timestamp of when the install happened.
    pub updated_at: DateTime<Utc>,
    /// Where the installed content came from, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl VersionRecord {
    /// Create a record stamped with the current time.
    #[must_use]
    pub fn new(version: &VersionString, source_url: Option<String>) -> Self {
        Self {
            version: version.as_str().to_string(),
            updated_at: Utc::now(),
            source_url,
        }
    }

    /// Load a record from `path`; `Ok(None)` when no sidecar exists.
    pub async fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read version record {}", path.display()))?;
        let record: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse version record {}", path.display()))?;
        Ok(Some(record))
    }

    /// Write the record to `path`.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize version record")?;
        fsutil::safe_write(path, &content).await?;
        debug!("wrote version record {} ({})", path.display(), self.version);
        Ok(())
    }
}

/// The plugin file as installed in the host's plugins directory.
#[derive(Debug, Clone)]
pub struct InstalledPlugin {
    name: String,
    path: PathBuf,
    sidecar_path: PathBuf,
}

impl InstalledPlugin {
    /// Describe the installed plugin at `path`.
    ///
    /// The sidecar path is derived by appending `.version.json` to the
    /// installed file name.
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let sidecar_path = sidecar_path_for(&path);
        Self {
            name: name.into(),
            path,
            sidecar_path,
        }
    }

    /// The plugin name the host knows this file by.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the installed source file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the JSON version sidecar.
    #[must_use]
    pub fn sidecar_path(&self) -> &Path {
        &self.sidecar_path
    }

    /// Whether the installed file exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the full installed source text.
    pub async fn read_source(&self) -> Result<String> {
        fsutil::read_text(&self.path).await
    }

    /// Determine the installed version.
    ///
    /// Tries the marker in the installed file first, then falls back to the
    /// sidecar record. Returns `Ok(None)` when neither yields a version -
    /// the indeterminate case the caller must treat as "skip this cycle".
    pub async fn current_version(&self) -> Result<Option<VersionString>> {
        if self.path.exists() {
            let text = self.read_source().await?;
            match marker::extract_version(&text, &self.path.display().to_string()) {
                Ok(version) => return Ok(Some(version)),
                Err(ReplugError::VersionMarkerMissing { .. }) => {
                    debug!(
                        "installed file {} has no version marker, consulting sidecar",
                        self.path.display()
                    );
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            warn!("installed plugin file {} is missing", self.path.display());
        }

        match VersionRecord::load(&self.sidecar_path).await? {
            Some(record) => match VersionString::parse(&record.version) {
                Ok(version) => Ok(Some(version)),
                Err(_) => {
                    warn!(
                        "sidecar {} holds an empty version, treating local version as unknown",
                        self.sidecar_path.display()
                    );
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Record `version` in the sidecar after a successful install.
    pub async fn record_version(
        &self,
        version: &VersionString,
        source_url: Option<String>,
    ) -> Result<()> {
        VersionRecord::new(version, source_url)
            .save(&self.sidecar_path)
            .await
    }
}

/// Sidecar path for an installed file: `<file>.version.json`.
fn sidecar_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(SIDECAR_SUFFIX);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_version_from_marker() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("pawprint.plugin.js");
        fs::write(&path, "/** @version 1.4.2 */\nbody\n").await.unwrap();

        let plugin = InstalledPlugin::new("pawprint", &path);
        let version = plugin.current_version().await.unwrap().unwrap();
        assert_eq!(version.as_str(), "1.4.2");
    }

    #[tokio::test]
    async fn test_sidecar_fallback() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("pawprint.plugin.js");
        fs::write(&path, "no marker\n").await.unwrap();

        let plugin = InstalledPlugin::new("pawprint", &path);
        assert!(plugin.current_version().await.unwrap().is_none());

        let recorded = VersionString::parse("2.0").unwrap();
        plugin.record_version(&recorded, None).await.unwrap();

        let version = plugin.current_version().await.unwrap().unwrap();
        assert_eq!(version, recorded);
    }

    #[tokio::test]
    async fn test_missing_file_and_sidecar_is_unknown() {
        let temp = TempDir::new().unwrap();
        let plugin = InstalledPlugin::new("ghost", temp.path().join("ghost.plugin.js"));
        assert!(plugin.current_version().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("p.js");
        let plugin = InstalledPlugin::new("p", &path);

        let version = VersionString::parse("3.6.2").unwrap();
        plugin
            .record_version(&version, Some("https://example.com/p.js".to_string()))
            .await
            .unwrap();

        let record = VersionRecord::load(plugin.sidecar_path()).await.unwrap().unwrap();
        assert_eq!(record.version, "3.6.2");
        assert_eq!(record.source_url.as_deref(), Some("https://example.com/p.js"));
    }

    #[test]
    fn test_sidecar_path_shape() {
        let plugin = InstalledPlugin::new("p", "/plugins/pawprint.plugin.js");
        assert_eq!(
            plugin.sidecar_path(),
            Path::new("/plugins/pawprint.plugin.js.version.json")
        );
    }
}
