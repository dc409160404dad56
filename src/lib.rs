//! replug - in-place self-update manager for host-loaded plugins
//!
//! A plugin that lives inside a third-party host application updates itself
//! from a remote plaintext source. The host exposes only a narrow capability
//! surface (enable, disable, reload) with no completion callbacks, the remote
//! endpoint is a bare HTTP GET, and the plugin's version is declared in a
//! documentation-comment marker inside its own source text. `replug` is the
//! machinery that makes that swap safe:
//!
//! - version comparison over dotted-integer strings of arbitrary arity
//! - remote and local version discovery via the shared marker pattern
//! - a sequenced swap (disable, write, enable, clean, reload) that never
//!   rewrites the file of the unit currently executing
//! - a generated short-lived helper that performs the swap on behalf of a
//!   plugin that would otherwise overwrite its own backing file
//!
//! # Core Modules
//!
//! - [`version`] - `VersionString` parsing, ordering, and marker extraction
//! - [`source`] - remote source retrieval (`PluginSource` trait, HTTP impl)
//! - [`install`] - installed-file inspection and the JSON sidecar record
//! - [`host`] - the host capability surface and acknowledgement polling
//! - [`swap`] - the update sequencer, backup handling, and helper handoff
//! - [`session`] - per-activation lifecycle that owns the moving parts
//!
//! # Supporting Modules
//!
//! - [`cli`] - command-line interface (`replug update`, `replug handoff`)
//! - [`config`] - global TOML configuration under the user directory
//! - [`core`] - error types and user-facing error rendering
//! - [`utils`] - atomic file operations
//!
//! # Update Cycle
//!
//! ```text
//! Idle -> Checking -> UpToDate -> Idle
//!                  -> UpdateAvailable -> Disabling -> Writing -> Enabling
//!                                         -> Cleaning -> Reloading
//! ```
//!
//! Every failure is recovered at the cycle boundary: logged, the cycle
//! aborts, and the installed version is left untouched. The worst case is a
//! stuck old version, never a corrupted plugin directory.
//!
//! # Example
//!
//! ```rust,no_run
//! use replug::config::UpdateSettings;
//! use replug::host::DetachedHost;
//! use replug::session::UpdateSession;
//! use replug::source::HttpSource;
//! use replug::swap::UpdateTarget;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let target = UpdateTarget::new(
//!     "pawprint",
//!     "/home/diane/.host/plugins/pawprint.plugin.js",
//!     "https://example.com/pawprint.plugin.js",
//! );
//! let source = HttpSource::new(target.source_url());
//! let mut session = UpdateSession::activate(
//!     UpdateSettings::default(),
//!     target,
//!     DetachedHost::new(),
//!     source,
//! )
//! .await?;
//!
//! let outcome = session.run_cycle().await;
//! println!("{outcome:?}");
//! session.deactivate().await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod host;
pub mod install;
pub mod session;
pub mod source;
pub mod swap;
pub mod utils;
pub mod version;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
