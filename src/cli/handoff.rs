//! The `replug handoff` command.
//!
//! Stages the short-lived helper plugin next to the installed target. Used
//! when the target is the unit currently executing inside the host: the
//! primary must not overwrite its own backing file, so the helper - once
//! enabled in the host - performs the disable/write/enable sequence on the
//! primary's behalf and then removes itself.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

use crate::cli::TargetOverrides;
use crate::config::GlobalConfig;
use crate::swap::HelperInstaller;
use crate::utils::fs as fsutil;

/// Arguments for `replug handoff`.
#[derive(Parser, Debug)]
pub struct HandoffArgs {
    /// Print the rendered helper source instead of staging it.
    #[arg(long)]
    pub print: bool,

    /// Render from a custom template file instead of the built-in one.
    #[arg(long, value_name = "PATH")]
    pub template: Option<PathBuf>,

    /// Remove a previously staged helper instead of staging one.
    #[arg(long)]
    pub remove: bool,

    /// Target overrides.
    #[command(flatten)]
    pub target: TargetOverrides,
}

/// Execute the handoff command.
pub async fn execute(args: HandoffArgs, config: GlobalConfig) -> Result<()> {
    let target = crate::cli::resolve_target(&config, &args.target)?;

    let mut helper = HelperInstaller::new(&target);
    if let Some(template_path) = &args.template {
        let template = fsutil::read_text(template_path)
            .await
            .context("Failed to read helper template")?;
        helper = helper.with_template(template);
    }

    if args.remove {
        if helper.remove().await? {
            println!("{}", format!("Removed helper at {}", helper.path().display()).green());
        } else {
            println!("No helper staged at {}", helper.path().display());
        }
        return Ok(());
    }

    if args.print {
        print!("{}", helper.render()?);
        return Ok(());
    }

    helper.install().await?;
    println!(
        "{}",
        format!("Staged helper at {}", helper.path().display()).green()
    );
    println!(
        "Enable '{}' in the host to perform the swap; the helper removes itself when done.",
        helper.helper_name().bold()
    );

    Ok(())
}
