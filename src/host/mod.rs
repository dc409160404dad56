//! The host application's plugin-management capability surface.
//!
//! The host is an external collaborator: it owns the plugins directory, loads
//! plugin files, and exposes exactly the operations this crate consumes -
//! `enable(name)`, `disable(name)`, `reload()`, and a best-effort state
//! probe. Their implementation is out of scope here; production integrations
//! implement [`HostControl`] against whatever bridge the host provides, and
//! tests use the scripted stub in `test_utils`.
//!
//! The host exposes no completion callbacks. Whether an enable or disable
//! signal "took" can only be inferred by polling [`HostControl::state`],
//! which is what [`await_state`] does: poll at a fixed interval until the
//! wanted state is observed or a timeout elapses. On timeout the caller logs
//! the missing acknowledgement and decides how to proceed - the elapsed wait
//! doubles as the quiesce delay the host's loader needs.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Observed state of a plugin as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    /// The host reports the plugin as loaded and running.
    Enabled,
    /// The host reports the plugin as present but not running.
    Disabled,
    /// The host cannot (or will not) report a state for this plugin.
    Unknown,
}

impl PluginState {
    /// Lowercase label used in log lines and error messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
            Self::Unknown => "unknown",
        }
    }
}

/// Capability surface the host exposes for plugin management.
///
/// All operations are advisory: a returned `Ok(())` means the signal was
/// delivered, not that it took effect. Use [`await_state`] to infer the
/// outcome.
#[async_trait]
pub trait HostControl: Send + Sync {
    /// Ask the host to load and run the named plugin.
    async fn enable(&self, name: &str) -> Result<()>;

    /// Ask the host to stop and unload the named plugin.
    async fn disable(&self, name: &str) -> Result<()>;

    /// Ask the host to perform a full reload, re-reading plugin files.
    async fn reload(&self) -> Result<()>;

    /// Best-effort probe of the named plugin's current state.
    ///
    /// Hosts with no introspection surface return
    /// [`PluginState::Unknown`]; polling then degrades to a plain delay.
    async fn state(&self, name: &str) -> Result<PluginState>;
}

/// Poll the host until `name` reaches `want` or `timeout` elapses.
///
/// Returns `true` if the state was observed, `false` on timeout. Probe
/// errors are logged at trace level and treated as [`PluginState::Unknown`]
/// so a flaky probe cannot abort an update cycle on its own.
pub async fn await_state<H: HostControl + ?Sized>(
    host: &H,
    name: &str,
    want: PluginState,
    timeout: Duration,
    poll_interval: Duration,
) -> bool {
    let deadline = Instant::now() + timeout;

    loop {
        let observed = match host.state(name).await {
            Ok(state) => state,
            Err(e) => {
                trace!("state probe for '{name}' failed: {e}");
                PluginState::Unknown
            }
        };

        if observed == want {
            debug!("host acknowledged '{}' for plugin '{name}'", want.label());
            return true;
        }

        if Instant::now() >= deadline {
            return false;
        }

        tokio::time::sleep(poll_interval).await;
    }
}

/// A host handle for running outside a live host process.
///
/// Used by the CLI: when replug runs detached from the host (the common case
/// for a command-line invocation), enable/disable signals have nowhere to go
/// and the plugin state cannot be observed. Signals are logged and dropped,
/// the state probe reports [`PluginState::Unknown`], and the swap relies on
/// the host re-reading the plugin file on its next reload.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedHost;

impl DetachedHost {
    /// Create a detached host handle.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HostControl for DetachedHost {
    async fn enable(&self, name: &str) -> Result<()> {
        debug!("detached from host; enable signal for '{name}' not delivered");
        Ok(())
    }

    async fn disable(&self, name: &str) -> Result<()> {
        debug!("detached from host; disable signal for '{name}' not delivered");
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        debug!("detached from host; reload signal not delivered");
        Ok(())
    }

    async fn state(&self, _name: &str) -> Result<PluginState> {
        Ok(PluginState::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ScriptedHost;

    #[tokio::test]
    async fn test_await_state_sees_acknowledgement() {
        let host = ScriptedHost::acknowledging();
        host.disable("pawprint").await.unwrap();

        let observed = await_state(
            &host,
            "pawprint",
            PluginState::Disabled,
            Duration::from_millis(200),
            Duration::from_millis(10),
        )
        .await;

        assert!(observed);
    }

    #[tokio::test]
    async fn test_await_state_times_out_without_acknowledgement() {
        let host = ScriptedHost::silent();
        host.disable("pawprint").await.unwrap();

        let start = Instant::now();
        let observed = await_state(
            &host,
            "pawprint",
            PluginState::Disabled,
            Duration::from_millis(100),
            Duration::from_millis(10),
        )
        .await;

        assert!(!observed);
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_detached_host_reports_unknown() {
        let host = DetachedHost::new();
        host.enable("x").await.unwrap();
        assert_eq!(host.state("x").await.unwrap(), PluginState::Unknown);
    }
}
