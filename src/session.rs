//! Per-activation session lifecycle.
//!
//! Everything an update cycle needs - settings, target, host handle, source -
//! is owned by one [`UpdateSession`] created at activation and torn down by
//! an explicit [`deactivate`](UpdateSession::deactivate). There is no
//! module-scope state: two sessions never share anything, and a test gets a
//! fresh world by constructing a fresh session.
//!
//! Activation sweeps the swap artifact a previous cycle may have left behind
//! (a staged helper that never got cleaned), so a crashed cycle can never
//! wedge the next one. Deactivation repeats the sweep and marks the session
//! closed; dropping a session that was never deactivated logs a warning
//! rather than silently leaking the teardown.

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::config::UpdateSettings;
use crate::host::HostControl;
use crate::source::{PluginSource, fetch_remote_version};
use crate::swap::{
    HelperInstaller, UpdateOutcome, UpdatePhase, UpdateSequencer, UpdateTarget,
};
use crate::version::VersionString;

/// Result of a compare-only check.
#[derive(Debug, Clone)]
pub struct CheckReport {
    /// The installed version, when it could be determined.
    pub local: Option<VersionString>,
    /// The version the remote source declares.
    pub remote: VersionString,
    /// Whether the remote version is strictly newer than the local one.
    pub update_available: bool,
}

/// A scoped handle over one activation of the update machinery.
pub struct UpdateSession<H: HostControl, S: PluginSource> {
    settings: UpdateSettings,
    target: UpdateTarget,
    host: H,
    source: S,
    last_phases: Vec<UpdatePhase>,
    active: bool,
}

impl<H: HostControl, S: PluginSource> UpdateSession<H, S> {
    /// Open a session and sweep leftover swap artifacts.
    pub async fn activate(
        settings: UpdateSettings,
        target: UpdateTarget,
        host: H,
        source: S,
    ) -> Result<Self> {
        info!("session activated for plugin '{}'", target.name());

        let session = Self {
            settings,
            target,
            host,
            source,
            last_phases: Vec::new(),
            active: true,
        };
        session.sweep_artifacts().await;
        Ok(session)
    }

    /// The target this session manages.
    #[must_use]
    pub fn target(&self) -> &UpdateTarget {
        &self.target
    }

    /// The host handle.
    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Phases entered by the most recent [`run_cycle`](Self::run_cycle).
    #[must_use]
    pub fn last_phases(&self) -> &[UpdatePhase] {
        &self.last_phases
    }

    /// Compare-only check: no file is touched and no host signal is sent.
    pub async fn check(&self) -> Result<CheckReport> {
        let local = self.target.installed().current_version().await?;
        let remote = fetch_remote_version(&self.source).await?;

        let update_available = match &local {
            Some(local) => remote.is_newer_than(local),
            None => false,
        };

        Ok(CheckReport {
            local,
            remote,
            update_available,
        })
    }

    /// Run one full update cycle. See [`UpdateSequencer::run_cycle`].
    pub async fn run_cycle(&mut self) -> UpdateOutcome {
        self.run_cycle_with_force(false).await
    }

    /// Run one update cycle, optionally forcing the swap.
    pub async fn run_cycle_with_force(&mut self, force: bool) -> UpdateOutcome {
        let mut sequencer =
            UpdateSequencer::new(&self.target, &self.settings, &self.host, &self.source)
                .force(force);
        let outcome = sequencer.run_cycle().await;
        self.last_phases = sequencer.phases().to_vec();
        outcome
    }

    /// Stage the update helper and ask the host to enable it.
    ///
    /// Used when this session runs inside the plugin being updated: the
    /// primary must not rewrite its own backing file, so the enabled helper
    /// performs the swap instead and removes itself when done.
    pub async fn stage_handoff(&self) -> Result<HelperInstaller> {
        let helper = HelperInstaller::new(&self.target);
        helper.install().await?;
        self.host.enable(&helper.helper_name()).await?;
        info!(
            "handed the swap of '{}' off to helper '{}'",
            self.target.name(),
            helper.helper_name()
        );
        Ok(helper)
    }

    /// Close the session, sweeping swap artifacts a final time.
    pub async fn deactivate(mut self) -> Result<()> {
        self.sweep_artifacts().await;
        self.active = false;
        info!("session deactivated for plugin '{}'", self.target.name());
        Ok(())
    }

    /// Remove a staged helper left behind by an earlier cycle.
    ///
    /// Backups are deliberately not swept: a backup that outlived its cycle
    /// is the rollback artifact of a failed write, and `update --rollback`
    /// consumes it. Successful cycles clean their own backup, and the next
    /// cycle's backup replaces a stale one.
    async fn sweep_artifacts(&self) {
        let helper = HelperInstaller::new(&self.target);
        match helper.remove().await {
            Ok(true) => debug!("swept stale helper at {}", helper.path().display()),
            Ok(false) => {}
            Err(e) => warn!("failed to sweep helper file: {e:#}"),
        }
    }
}

impl<H: HostControl, S: PluginSource> Drop for UpdateSession<H, S> {
    fn drop(&mut self) {
        if self.active {
            warn!(
                "session for '{}' dropped without deactivate; artifacts will be swept on next activation",
                self.target.name()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::DetachedHost;
    use crate::test_utils::{StaticSource, test_settings};
    use tempfile::TempDir;

    fn target_in(dir: &std::path::Path) -> UpdateTarget {
        UpdateTarget::new(
            "pawprint",
            dir.join("pawprint.plugin.js"),
            "https://example.com/pawprint.plugin.js",
        )
    }

    #[tokio::test]
    async fn test_activation_sweeps_stale_helper_but_keeps_backup() {
        let temp = TempDir::new().unwrap();
        let target = target_in(temp.path());
        tokio::fs::write(target.install_path(), "/** @version 1.0 */\n")
            .await
            .unwrap();

        // Leave debris from a hypothetical crashed cycle.
        let helper = HelperInstaller::new(&target);
        helper.install().await.unwrap();
        let backup = crate::swap::BackupManager::new(target.install_path());
        backup.create_backup().await.unwrap();

        let session = UpdateSession::activate(
            test_settings(),
            target,
            DetachedHost::new(),
            StaticSource::new("/** @version 1.0 */\n"),
        )
        .await
        .unwrap();

        assert!(!helper.is_staged());
        // The backup is the rollback artifact; activation must not eat it.
        assert!(backup.backup_exists());
        session.deactivate().await.unwrap();
    }

    #[tokio::test]
    async fn test_check_reports_update() {
        let temp = TempDir::new().unwrap();
        let target = target_in(temp.path());
        tokio::fs::write(target.install_path(), "/** @version 1.0 */\n")
            .await
            .unwrap();

        let session = UpdateSession::activate(
            test_settings(),
            target,
            DetachedHost::new(),
            StaticSource::new("/** @version 1.1 */\n"),
        )
        .await
        .unwrap();

        let report = session.check().await.unwrap();
        assert!(report.update_available);
        assert_eq!(report.local.unwrap().as_str(), "1.0");
        assert_eq!(report.remote.as_str(), "1.1");
        session.deactivate().await.unwrap();
    }

    #[tokio::test]
    async fn test_stage_handoff_installs_and_enables_helper() {
        use crate::test_utils::ScriptedHost;

        let temp = TempDir::new().unwrap();
        let target = target_in(temp.path());
        tokio::fs::write(target.install_path(), "/** @version 1.0 */\n")
            .await
            .unwrap();

        let session = UpdateSession::activate(
            test_settings(),
            target,
            ScriptedHost::acknowledging(),
            StaticSource::new("/** @version 1.1 */\n"),
        )
        .await
        .unwrap();

        let helper = session.stage_handoff().await.unwrap();
        assert!(helper.is_staged());
        assert!(session.host().enable_signalled(&helper.helper_name()));

        // Deactivation sweeps the staged helper.
        session.deactivate().await.unwrap();
        assert!(!helper.is_staged());
    }

    #[tokio::test]
    async fn test_check_with_unknown_local_is_not_an_update() {
        let temp = TempDir::new().unwrap();
        let target = target_in(temp.path());
        tokio::fs::write(target.install_path(), "no marker\n")
            .await
            .unwrap();

        let session = UpdateSession::activate(
            test_settings(),
            target,
            DetachedHost::new(),
            StaticSource::new("/** @version 1.1 */\n"),
        )
        .await
        .unwrap();

        let report = session.check().await.unwrap();
        assert!(!report.update_available);
        assert!(report.local.is_none());
        session.deactivate().await.unwrap();
    }
}
