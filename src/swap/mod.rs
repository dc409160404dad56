//! The self-replacement sequencer.
//!
//! One update cycle walks a fixed sequence of phases:
//!
//! ```text
//! Idle -> Checking -> { UpToDate -> Idle,
//!                       UpdateAvailable -> Disabling -> Writing -> Enabling
//!                                           -> Cleaning -> Reloading }
//! ```
//!
//! - **Checking**: read the local version, fetch the remote source, compare.
//! - **Disabling**: signal the host to unload the plugin, then poll for the
//!   acknowledgement (or let the quiesce timeout elapse) before touching the
//!   file, so the host never runs stale in-memory state against rewritten
//!   bytes.
//! - **Writing**: back up the installed file, then overwrite it with the
//!   fetched body. A failure here leaves the plugin disabled: re-enabling a
//!   partially written file could crash the host's loader, so no enable
//!   signal is issued for the rest of the cycle.
//! - **Enabling**: signal the host to re-enable the plugin; the
//!   acknowledgement is best-effort since the reload re-reads the file
//!   regardless.
//! - **Cleaning**: remove any staged helper file, refresh the version
//!   sidecar, drop the backup.
//! - **Reloading**: request a full host reload so the new version is the one
//!   actually executing afterward.
//!
//! Every step logs on failure and nothing is retried: a failed cycle leaves
//! the installed version in place until the next activation. Failures are
//! modeled as [`UpdateOutcome`] values, not errors - the cycle itself is
//! infallible by design, because the worst acceptable outcome is a stuck old
//! version.

pub mod backup;
pub mod helper;

pub use backup::BackupManager;
pub use helper::HelperInstaller;

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::config::UpdateSettings;
use crate::host::{HostControl, PluginState, await_state};
use crate::install::InstalledPlugin;
use crate::source::PluginSource;
use crate::utils::fs as fsutil;
use crate::version::{VersionString, marker};

/// Identifies what to update: the installed file and where its replacement
/// content comes from. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct UpdateTarget {
    name: String,
    install_path: PathBuf,
    source_url: String,
}

impl UpdateTarget {
    /// Describe an update target.
    ///
    /// `name` is the identifier the host knows the plugin by;
    /// `install_path` is the installed source file; `source_url` is the
    /// remote endpoint serving the replacement text.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        install_path: impl Into<PathBuf>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            install_path: install_path.into(),
            source_url: source_url.into(),
        }
    }

    /// The plugin name the host knows this target by.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the installed file.
    #[must_use]
    pub fn install_path(&self) -> &Path {
        &self.install_path
    }

    /// The remote source URL.
    #[must_use]
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// View of the installed plugin file for this target.
    #[must_use]
    pub fn installed(&self) -> InstalledPlugin {
        InstalledPlugin::new(&self.name, &self.install_path)
    }
}

/// Result of one update cycle. Produced once per check, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The installed version is current; nothing was touched.
    UpToDate,
    /// The swap completed; the installed file now holds this version.
    Updated(VersionString),
    /// The check could not be completed; the installed file is untouched.
    CheckFailed(String),
    /// The write step failed; the plugin was left disabled.
    WriteFailed(String),
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpToDate => write!(f, "already up to date"),
            Self::Updated(version) => write!(f, "updated to {version}"),
            Self::CheckFailed(reason) => write!(f, "check failed: {reason}"),
            Self::WriteFailed(reason) => write!(f, "write failed: {reason}"),
        }
    }
}

/// Phases of the self-replacement state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePhase {
    /// No cycle in flight.
    Idle,
    /// Reading local and remote versions and comparing.
    Checking,
    /// Quiescing the running plugin before the write.
    Disabling,
    /// Overwriting the installed file with the fetched body.
    Writing,
    /// Signalling the host to re-enable the plugin.
    Enabling,
    /// Removing the helper file, refreshing the sidecar, dropping the backup.
    Cleaning,
    /// Requesting a full host reload.
    Reloading,
}

impl UpdatePhase {
    /// Lowercase label used in log lines.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Checking => "checking",
            Self::Disabling => "disabling",
            Self::Writing => "writing",
            Self::Enabling => "enabling",
            Self::Cleaning => "cleaning",
            Self::Reloading => "reloading",
        }
    }
}

/// Drives one update cycle for a target against a host and a source.
///
/// The sequencer records every phase it enters; the log is observable via
/// [`phases`](Self::phases) after the cycle, which is also how the tests
/// assert the declared ordering.
pub struct UpdateSequencer<'a, H: HostControl + ?Sized, S: PluginSource + ?Sized> {
    target: &'a UpdateTarget,
    settings: &'a UpdateSettings,
    host: &'a H,
    source: &'a S,
    force: bool,
    phase: UpdatePhase,
    phase_log: Vec<UpdatePhase>,
}

impl<'a, H: HostControl + ?Sized, S: PluginSource + ?Sized> UpdateSequencer<'a, H, S> {
    /// Create a sequencer in the `Idle` phase.
    pub fn new(
        target: &'a UpdateTarget,
        settings: &'a UpdateSettings,
        host: &'a H,
        source: &'a S,
    ) -> Self {
        Self {
            target,
            settings,
            host,
            source,
            force: false,
            phase: UpdatePhase::Idle,
            phase_log: Vec::new(),
        }
    }

    /// Proceed with the swap even when the remote version is not newer, or
    /// when the local version cannot be determined. Used for reinstalls.
    #[must_use]
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// The current phase.
    #[must_use]
    pub fn phase(&self) -> UpdatePhase {
        self.phase
    }

    /// Every phase entered so far, in order.
    #[must_use]
    pub fn phases(&self) -> &[UpdatePhase] {
        &self.phase_log
    }

    fn enter(&mut self, phase: UpdatePhase) {
        debug!("entering phase: {}", phase.label());
        self.phase = phase;
        self.phase_log.push(phase);
    }

    /// Run one full update cycle.
    ///
    /// Infallible: every failure kind is logged and folded into the returned
    /// [`UpdateOutcome`]. The sequencer ends in `Idle` unless the cycle
    /// reached the write step, after which the terminal phase is whatever
    /// was last entered.
    pub async fn run_cycle(&mut self) -> UpdateOutcome {
        let name = self.target.name();

        self.enter(UpdatePhase::Checking);
        let plugin = self.target.installed();

        let local = match plugin.current_version().await {
            Ok(version) => version,
            Err(e) => {
                warn!("could not read local version for '{name}': {e:#}");
                self.phase = UpdatePhase::Idle;
                return UpdateOutcome::CheckFailed(format!("local version read failed: {e:#}"));
            }
        };

        let body = match self.source.fetch().await {
            Ok(body) => body,
            Err(e) => {
                warn!("remote fetch for '{name}' failed: {e:#}");
                self.phase = UpdatePhase::Idle;
                return UpdateOutcome::CheckFailed(format!("remote fetch failed: {e:#}"));
            }
        };

        let remote = match marker::extract_version(&body, self.source.location()) {
            Ok(version) => version,
            Err(e) => {
                warn!("remote source for '{name}' has no usable version: {e}");
                self.phase = UpdatePhase::Idle;
                return UpdateOutcome::CheckFailed(e.to_string());
            }
        };

        match &local {
            Some(local) => {
                if !remote.is_newer_than(local) && !self.force {
                    info!("'{name}' is up to date ({local})");
                    self.phase = UpdatePhase::Idle;
                    return UpdateOutcome::UpToDate;
                }
                info!("update available for '{name}': {local} -> {remote}");
            }
            None if self.force => {
                info!("local version of '{name}' unknown; forcing install of {remote}");
            }
            None => {
                // Indeterminate comparison: skip rather than guess.
                info!("local version of '{name}' could not be determined; skipping cycle");
                self.phase = UpdatePhase::Idle;
                return UpdateOutcome::CheckFailed(
                    "local version could not be determined".to_string(),
                );
            }
        }

        self.enter(UpdatePhase::Disabling);
        if let Err(e) = self.host.disable(name).await {
            warn!("host disable signal for '{name}' failed: {e:#}; aborting cycle");
            self.phase = UpdatePhase::Idle;
            return UpdateOutcome::CheckFailed(format!("host disable failed: {e:#}"));
        }

        let quiesced = await_state(
            self.host,
            name,
            PluginState::Disabled,
            self.settings.quiesce_timeout(),
            self.settings.poll_interval(),
        )
        .await;
        if !quiesced {
            // The host exposes no completion callback; the elapsed timeout
            // stands in for the quiesce delay and the cycle proceeds.
            warn!(
                "host did not acknowledge disable for '{name}' within {}ms; proceeding",
                self.settings.quiesce_timeout_ms
            );
        }

        self.enter(UpdatePhase::Writing);
        let backup = BackupManager::new(self.target.install_path());
        let mut backed_up = false;
        if self.settings.auto_backup && self.target.install_path().exists() {
            match backup.create_backup().await {
                Ok(()) => backed_up = true,
                Err(e) => {
                    return self
                        .write_failed(format!("backup failed: {e:#}"), &backup, false)
                        .await;
                }
            }
        }

        if let Err(e) = fsutil::safe_write(self.target.install_path(), &body).await {
            return self
                .write_failed(format!("write failed: {e:#}"), &backup, backed_up)
                .await;
        }
        info!(
            "wrote {} bytes to {}",
            body.len(),
            self.target.install_path().display()
        );

        self.enter(UpdatePhase::Enabling);
        if let Err(e) = self.host.enable(name).await {
            warn!("host enable signal for '{name}' failed: {e:#}");
        } else {
            let acknowledged = await_state(
                self.host,
                name,
                PluginState::Enabled,
                self.settings.quiesce_timeout(),
                self.settings.poll_interval(),
            )
            .await;
            if !acknowledged {
                warn!(
                    "host did not acknowledge enable for '{name}'; the reload will pick up the new file"
                );
            }
        }

        self.enter(UpdatePhase::Cleaning);
        let helper = HelperInstaller::new(self.target);
        if let Err(e) = helper.remove().await {
            warn!("failed to remove helper file: {e:#}");
        }
        if let Err(e) = plugin
            .record_version(&remote, Some(self.target.source_url().to_string()))
            .await
        {
            warn!("failed to refresh version record: {e:#}");
        }
        if let Err(e) = backup.cleanup_backup().await {
            warn!("failed to remove backup: {e:#}");
        }

        self.enter(UpdatePhase::Reloading);
        if let Err(e) = self.host.reload().await {
            warn!("host reload request failed: {e:#}");
        }

        info!("'{name}' updated to {remote}");
        UpdateOutcome::Updated(remote)
    }

    /// Fold a Writing-phase failure into its outcome.
    ///
    /// The plugin stays disabled either way: a restored backup repairs the
    /// bytes, but this cycle issues no enable signal for a file it failed to
    /// write.
    async fn write_failed(
        &mut self,
        reason: String,
        backup: &BackupManager,
        backed_up: bool,
    ) -> UpdateOutcome {
        error!(
            "{reason}; plugin '{}' is left disabled for this cycle",
            self.target.name()
        );

        if backed_up {
            if let Err(e) = backup.restore_backup().await {
                warn!(
                    "backup restore failed: {e:#}; backup kept at {}",
                    backup.backup_path().display()
                );
            }
        }

        UpdateOutcome::WriteFailed(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ScriptedHost, StaticSource, test_settings};
    use tempfile::TempDir;

    fn target_in(dir: &Path) -> UpdateTarget {
        UpdateTarget::new(
            "pawprint",
            dir.join("pawprint.plugin.js"),
            "https://example.com/pawprint.plugin.js",
        )
    }

    #[tokio::test]
    async fn test_up_to_date_cycle_stops_at_checking() {
        let temp = TempDir::new().unwrap();
        let target = target_in(temp.path());
        tokio::fs::write(target.install_path(), "/** @version 1.1 */\n")
            .await
            .unwrap();

        let host = ScriptedHost::acknowledging();
        let source = StaticSource::new("/** @version 1.1 */\n");
        let settings = test_settings();

        let mut sequencer = UpdateSequencer::new(&target, &settings, &host, &source);
        let outcome = sequencer.run_cycle().await;

        assert_eq!(outcome, UpdateOutcome::UpToDate);
        assert_eq!(sequencer.phases(), &[UpdatePhase::Checking]);
        assert!(host.signals().is_empty());
    }

    #[tokio::test]
    async fn test_force_reinstalls_equal_version() {
        let temp = TempDir::new().unwrap();
        let target = target_in(temp.path());
        tokio::fs::write(target.install_path(), "/** @version 1.1 */\nold body\n")
            .await
            .unwrap();

        let host = ScriptedHost::acknowledging();
        let source = StaticSource::new("/** @version 1.1 */\nnew body\n");
        let settings = test_settings();

        let outcome = UpdateSequencer::new(&target, &settings, &host, &source)
            .force(true)
            .run_cycle()
            .await;

        assert!(matches!(outcome, UpdateOutcome::Updated(_)));
        let installed = tokio::fs::read_to_string(target.install_path()).await.unwrap();
        assert!(installed.contains("new body"));
    }

    #[tokio::test]
    async fn test_unknown_local_version_skips() {
        let temp = TempDir::new().unwrap();
        let target = target_in(temp.path());
        tokio::fs::write(target.install_path(), "no marker here\n")
            .await
            .unwrap();

        let host = ScriptedHost::acknowledging();
        let source = StaticSource::new("/** @version 9.9 */\n");
        let settings = test_settings();

        let before = tokio::fs::read(target.install_path()).await.unwrap();
        let outcome = UpdateSequencer::new(&target, &settings, &host, &source)
            .run_cycle()
            .await;
        let after = tokio::fs::read(target.install_path()).await.unwrap();

        assert!(matches!(outcome, UpdateOutcome::CheckFailed(_)));
        assert_eq!(before, after);
        assert!(host.signals().is_empty());
    }

    #[tokio::test]
    async fn test_disable_signal_failure_aborts_before_write() {
        let temp = TempDir::new().unwrap();
        let target = target_in(temp.path());
        tokio::fs::write(target.install_path(), "/** @version 1.0 */\nold\n")
            .await
            .unwrap();

        let host = ScriptedHost::acknowledging().failing_disable();
        let source = StaticSource::new("/** @version 1.1 */\nnew\n");
        let settings = test_settings();

        let outcome = UpdateSequencer::new(&target, &settings, &host, &source)
            .run_cycle()
            .await;

        assert!(matches!(outcome, UpdateOutcome::CheckFailed(_)));
        let installed = tokio::fs::read_to_string(target.install_path()).await.unwrap();
        assert!(installed.contains("old"));
    }
}
