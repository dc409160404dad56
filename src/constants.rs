//! Global constants used throughout the replug codebase.
//!
//! Timeouts, poll intervals, and file-name suffixes shared across modules.
//! Defining them centrally keeps the magic numbers discoverable and the
//! config defaults in one place.

use std::time::Duration;

/// How long to poll the host for a plugin-state acknowledgement (5 seconds).
///
/// The host exposes no completion callback for enable/disable, so the
/// sequencer polls [`HostControl::state`](crate::host::HostControl::state)
/// instead. When the timeout elapses without an acknowledgement the sequencer
/// logs the fact and proceeds; the elapsed wait stands in for the fixed delay
/// the host's loader needs to quiesce.
pub const QUIESCE_TIMEOUT: Duration = Duration::from_secs(5);

/// Interval between host-state probes while waiting for an acknowledgement.
pub const STATE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Suffix appended to the installed file for the pre-write backup copy.
pub const BACKUP_SUFFIX: &str = "backup";

/// Suffix appended to the installed file for the JSON version sidecar.
pub const SIDECAR_SUFFIX: &str = "version.json";

/// Name fragment inserted into generated helper file names.
///
/// A target installed at `pawprint.plugin.js` gets its helper staged at
/// `pawprint.updater.plugin.js`, next to the file it will overwrite.
pub const HELPER_TAG: &str = "updater";
