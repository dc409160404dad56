//! Command-line interface.
//!
//! Two subcommands:
//!
//! - `replug update` - check for, apply, or roll back an update of the
//!   configured plugin (`--check`, `--status`, `--force`, `--no-backup`,
//!   `--rollback`, `--yes`)
//! - `replug handoff` - render and stage the short-lived helper that swaps a
//!   plugin which cannot overwrite its own backing file
//!
//! The update target comes from the global config file; `--name`, `--file`
//! and `--url` override it per invocation.

pub mod handoff;
pub mod update;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::GlobalConfig;
use crate::core::ReplugError;
use crate::swap::UpdateTarget;

/// Top-level command-line interface.
#[derive(Parser, Debug)]
#[command(name = "replug", version, about = "In-place self-update manager for host-loaded plugins")]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output (equivalent to RUST_LOG=replug=debug).
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the config file (overrides REPLUG_CONFIG and the default).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Check for, apply, or roll back a plugin update.
    Update(update::UpdateArgs),
    /// Stage the helper that performs the swap for a self-hosted target.
    Handoff(handoff::HandoffArgs),
}

impl Cli {
    /// Execute the parsed command.
    pub async fn execute(self) -> Result<()> {
        self.init_logging();

        let config = match &self.config {
            Some(path) => GlobalConfig::load_from(path).await?,
            None => GlobalConfig::load().await?,
        };

        match self.command {
            Commands::Update(args) => update::execute(args, config).await,
            Commands::Handoff(args) => handoff::execute(args, config).await,
        }
    }

    fn init_logging(&self) {
        let default_filter = if self.verbose {
            "replug=debug"
        } else if self.quiet {
            "replug=error"
        } else {
            "replug=warn"
        };

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .ok();
    }
}

/// Per-invocation overrides for the configured update target.
#[derive(Args, Debug, Default)]
pub struct TargetOverrides {
    /// Plugin name the host knows the target by.
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Path of the installed plugin file.
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Remote URL serving the replacement source text.
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,
}

/// Combine the configured target with command-line overrides.
pub(crate) fn resolve_target(
    config: &GlobalConfig,
    overrides: &TargetOverrides,
) -> Result<UpdateTarget> {
    let configured = config.target.as_ref();

    let name = overrides
        .name
        .clone()
        .or_else(|| configured.map(|t| t.name.clone()));
    let file = overrides
        .file
        .clone()
        .or_else(|| configured.map(|t| t.install_path.clone()));
    let url = overrides
        .url
        .clone()
        .or_else(|| configured.map(|t| t.source_url.clone()));

    match (name, file, url) {
        (Some(name), Some(file), Some(url)) => Ok(UpdateTarget::new(name, file, url)),
        _ => Err(ReplugError::TargetNotConfigured.into()),
    }
}
