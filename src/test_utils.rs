//! Test doubles for the host and the remote source.
//!
//! Compiled for unit tests and, behind the `test-utils` feature, for the
//! integration suite. Nothing here ships in a default build.

use anyhow::{Result, bail};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::config::UpdateSettings;
use crate::core::ReplugError;
use crate::host::{HostControl, PluginState};
use crate::source::PluginSource;

/// Settings with short timeouts so acknowledgement polling doesn't slow the
/// suite down.
#[must_use]
pub fn test_settings() -> UpdateSettings {
    UpdateSettings {
        check_on_activation: true,
        quiesce_timeout_ms: 50,
        poll_interval_ms: 5,
        auto_backup: true,
        confirm: false,
    }
}

/// A signal delivered to the scripted host, in order of arrival.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostSignal {
    /// `enable(name)` was called.
    Enable(String),
    /// `disable(name)` was called.
    Disable(String),
    /// `reload()` was called.
    Reload,
}

/// Scriptable [`HostControl`] implementation that records every signal.
///
/// In acknowledging mode, enable/disable immediately flip the reported state
/// so polling succeeds on the first probe. In silent mode the state stays
/// [`PluginState::Unknown`] and polling runs into its timeout, modeling a
/// host with no introspection surface.
#[derive(Debug, Default)]
pub struct ScriptedHost {
    acknowledge: bool,
    fail_disable: bool,
    fail_enable: bool,
    signals: Mutex<Vec<HostSignal>>,
    states: Mutex<HashMap<String, PluginState>>,
}

impl ScriptedHost {
    /// A host that acknowledges every signal via its state probe.
    #[must_use]
    pub fn acknowledging() -> Self {
        Self {
            acknowledge: true,
            ..Self::default()
        }
    }

    /// A host that accepts signals but never reports a state.
    #[must_use]
    pub fn silent() -> Self {
        Self::default()
    }

    /// Make `disable` calls return an error.
    #[must_use]
    pub fn failing_disable(mut self) -> Self {
        self.fail_disable = true;
        self
    }

    /// Make `enable` calls return an error.
    #[must_use]
    pub fn failing_enable(mut self) -> Self {
        self.fail_enable = true;
        self
    }

    /// Pre-seed the reported state for a plugin.
    pub fn set_state(&self, name: &str, state: PluginState) {
        self.states
            .lock()
            .expect("state lock poisoned")
            .insert(name.to_string(), state);
    }

    /// Every signal received so far, in order.
    #[must_use]
    pub fn signals(&self) -> Vec<HostSignal> {
        self.signals.lock().expect("signal lock poisoned").clone()
    }

    /// Whether an enable signal was ever issued for `name`.
    #[must_use]
    pub fn enable_signalled(&self, name: &str) -> bool {
        self.signals()
            .iter()
            .any(|signal| matches!(signal, HostSignal::Enable(n) if n == name))
    }

    /// Whether a reload was ever requested.
    #[must_use]
    pub fn reload_requested(&self) -> bool {
        self.signals().contains(&HostSignal::Reload)
    }

    fn record(&self, signal: HostSignal) {
        self.signals.lock().expect("signal lock poisoned").push(signal);
    }
}

#[async_trait]
impl HostControl for ScriptedHost {
    async fn enable(&self, name: &str) -> Result<()> {
        if self.fail_enable {
            bail!("scripted enable failure for '{name}'");
        }
        self.record(HostSignal::Enable(name.to_string()));
        if self.acknowledge {
            self.set_state(name, PluginState::Enabled);
        }
        Ok(())
    }

    async fn disable(&self, name: &str) -> Result<()> {
        if self.fail_disable {
            bail!("scripted disable failure for '{name}'");
        }
        self.record(HostSignal::Disable(name.to_string()));
        if self.acknowledge {
            self.set_state(name, PluginState::Disabled);
        }
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        self.record(HostSignal::Reload);
        Ok(())
    }

    async fn state(&self, name: &str) -> Result<PluginState> {
        Ok(self
            .states
            .lock()
            .expect("state lock poisoned")
            .get(name)
            .copied()
            .unwrap_or(PluginState::Unknown))
    }
}

/// [`PluginSource`] serving a fixed body.
#[derive(Debug, Clone)]
pub struct StaticSource {
    url: String,
    body: String,
}

impl StaticSource {
    /// A source that returns `body` on every fetch.
    #[must_use]
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            url: "https://example.com/remote.plugin.js".to_string(),
            body: body.into(),
        }
    }
}

#[async_trait]
impl PluginSource for StaticSource {
    fn location(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<String> {
        Ok(self.body.clone())
    }
}

/// [`PluginSource`] that always fails, simulating a network error or a
/// non-success status.
#[derive(Debug, Clone)]
pub struct FailingSource {
    url: String,
    reason: String,
}

impl FailingSource {
    /// Simulate a non-2xx response.
    #[must_use]
    pub fn with_status(status: u16) -> Self {
        Self {
            url: "https://example.com/remote.plugin.js".to_string(),
            reason: format!("HTTP {status}"),
        }
    }

    /// Simulate a transport-level failure.
    #[must_use]
    pub fn unreachable() -> Self {
        Self {
            url: "https://example.com/remote.plugin.js".to_string(),
            reason: "connection refused".to_string(),
        }
    }
}

#[async_trait]
impl PluginSource for FailingSource {
    fn location(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<String> {
        Err(ReplugError::NetworkFailure {
            url: self.url.clone(),
            reason: self.reason.clone(),
        }
        .into())
    }
}
