//! Global configuration.
//!
//! One TOML file under the user directory (`~/.replug/config.toml`, or the
//! path in the `REPLUG_CONFIG` environment variable, which tests use for
//! isolation) holding the update target and the update behavior knobs:
//!
//! ```toml
//! [target]
//! name = "pawprint"
//! install_path = "/home/diane/.host/plugins/pawprint.plugin.js"
//! source_url = "https://example.com/pawprint.plugin.js"
//!
//! [update]
//! check_on_activation = true
//! quiesce_timeout_ms = 5000
//! poll_interval_ms = 100
//! auto_backup = true
//! confirm = true
//! ```
//!
//! A missing file yields the defaults; every field is individually
//! defaulted so partial files stay valid across upgrades.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::debug;

use crate::constants::{QUIESCE_TIMEOUT, STATE_POLL_INTERVAL};
use crate::swap::UpdateTarget;
use crate::utils::fs as fsutil;

/// Behavior knobs for the update cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSettings {
    /// Whether activation runs an update check. The original behavior:
    /// checks happen once per activation, never on a schedule.
    #[serde(default = "default_check_on_activation")]
    pub check_on_activation: bool,

    /// How long to poll for a host acknowledgement before proceeding, in
    /// milliseconds. The elapsed timeout doubles as the quiesce delay when
    /// the host never answers.
    #[serde(default = "default_quiesce_timeout_ms")]
    pub quiesce_timeout_ms: u64,

    /// Interval between host-state probes, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Whether to back up the installed file before overwriting it.
    #[serde(default = "default_auto_backup")]
    pub auto_backup: bool,

    /// Whether the CLI asks for confirmation before applying an update.
    #[serde(default = "default_confirm")]
    pub confirm: bool,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            check_on_activation: default_check_on_activation(),
            quiesce_timeout_ms: default_quiesce_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            auto_backup: default_auto_backup(),
            confirm: default_confirm(),
        }
    }
}

impl UpdateSettings {
    /// The quiesce timeout as a [`Duration`].
    #[must_use]
    pub fn quiesce_timeout(&self) -> Duration {
        Duration::from_millis(self.quiesce_timeout_ms)
    }

    /// The poll interval as a [`Duration`].
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_check_on_activation() -> bool {
    true
}

fn default_quiesce_timeout_ms() -> u64 {
    QUIESCE_TIMEOUT.as_millis() as u64
}

fn default_poll_interval_ms() -> u64 {
    STATE_POLL_INTERVAL.as_millis() as u64
}

fn default_auto_backup() -> bool {
    true
}

fn default_confirm() -> bool {
    true
}

/// The configured update target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Plugin name the host knows the target by.
    pub name: String,
    /// Path of the installed plugin file.
    pub install_path: PathBuf,
    /// Remote endpoint serving the replacement source text.
    pub source_url: String,
}

impl TargetConfig {
    /// Build the immutable [`UpdateTarget`] this configuration describes.
    #[must_use]
    pub fn to_target(&self) -> UpdateTarget {
        UpdateTarget::new(&self.name, &self.install_path, &self.source_url)
    }
}

/// Global replug configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// The update target, when one is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetConfig>,

    /// Update behavior settings.
    #[serde(default)]
    pub update: UpdateSettings,
}

impl GlobalConfig {
    /// Resolve the configuration file path.
    ///
    /// `REPLUG_CONFIG` wins when set; otherwise `~/.replug/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("REPLUG_CONFIG") {
            return Ok(PathBuf::from(path));
        }

        Ok(dirs::home_dir()
            .context("Could not determine home directory")?
            .join(".replug")
            .join("config.toml"))
    }

    /// Load the configuration from the default location.
    ///
    /// A missing file yields [`GlobalConfig::default`].
    pub async fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?).await
    }

    /// Load the configuration from an explicit path.
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;

        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Write the configuration to an explicit path.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fsutil::safe_write(path, &content).await?;
        debug!("saved config to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_settings_defaults() {
        let settings = UpdateSettings::default();
        assert!(settings.check_on_activation);
        assert_eq!(settings.quiesce_timeout_ms, 5000);
        assert_eq!(settings.poll_interval_ms, 100);
        assert!(settings.auto_backup);
        assert!(settings.confirm);
    }

    #[tokio::test]
    async fn test_missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let config = GlobalConfig::load_from(&temp.path().join("absent.toml"))
            .await
            .unwrap();
        assert!(config.target.is_none());
        assert!(config.update.auto_backup);
    }

    #[tokio::test]
    async fn test_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        let mut config = GlobalConfig::default();
        config.target = Some(TargetConfig {
            name: "pawprint".to_string(),
            install_path: PathBuf::from("/plugins/pawprint.plugin.js"),
            source_url: "https://example.com/pawprint.plugin.js".to_string(),
        });
        config.update.quiesce_timeout_ms = 1234;
        config.save_to(&path).await.unwrap();

        let loaded = GlobalConfig::load_from(&path).await.unwrap();
        let target = loaded.target.unwrap();
        assert_eq!(target.name, "pawprint");
        assert_eq!(loaded.update.quiesce_timeout_ms, 1234);
    }

    #[tokio::test]
    async fn test_partial_file_uses_field_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        tokio::fs::write(&path, "[update]\nauto_backup = false\n")
            .await
            .unwrap();

        let config = GlobalConfig::load_from(&path).await.unwrap();
        assert!(!config.update.auto_backup);
        assert!(config.update.check_on_activation);
        assert_eq!(config.update.poll_interval_ms, 100);
    }
}
