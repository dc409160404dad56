//! The `replug update` command.
//!
//! Modes, mirroring the flags:
//!
//! - default: run one full update cycle (with a confirmation prompt unless
//!   `--yes` or the config disables it)
//! - `--check`: compare local and remote versions without touching anything
//! - `--status`: show the installed version and, when reachable, the remote
//! - `--rollback`: restore the installed file from the pre-write backup
//! - `--force`: apply the swap even when not newer (reinstall)
//! - `--no-backup`: skip the pre-write backup (not recommended)

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;

use crate::cli::TargetOverrides;
use crate::config::GlobalConfig;
use crate::host::DetachedHost;
use crate::session::UpdateSession;
use crate::source::HttpSource;
use crate::swap::{BackupManager, UpdateOutcome, UpdateTarget};

/// Arguments for `replug update`.
#[derive(Parser, Debug)]
pub struct UpdateArgs {
    /// Check for an update without installing anything.
    #[arg(long)]
    pub check: bool,

    /// Show the installed version and the latest available.
    #[arg(short, long)]
    pub status: bool,

    /// Apply the swap even if the remote version is not newer.
    #[arg(short, long)]
    pub force: bool,

    /// Restore the installed file from the pre-write backup.
    #[arg(long)]
    pub rollback: bool,

    /// Skip creating a backup before the write (not recommended).
    #[arg(long)]
    pub no_backup: bool,

    /// Skip the confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,

    /// Target overrides.
    #[command(flatten)]
    pub target: TargetOverrides,
}

/// Execute the update command.
pub async fn execute(args: UpdateArgs, config: GlobalConfig) -> Result<()> {
    let target = crate::cli::resolve_target(&config, &args.target)?;

    if args.rollback {
        return handle_rollback(&target).await;
    }

    let mut settings = config.update.clone();
    if args.no_backup {
        settings.auto_backup = false;
    }
    if args.yes {
        settings.confirm = false;
    }
    let confirm = settings.confirm;

    let source = HttpSource::new(target.source_url());
    let mut session =
        UpdateSession::activate(settings, target, DetachedHost::new(), source).await?;

    if args.status {
        show_status(&session).await;
        return session.deactivate().await;
    }

    if args.check {
        let result = check_for_updates(&session).await;
        session.deactivate().await?;
        return result;
    }

    // Resolve versions up front so the prompt can name them.
    if !args.force {
        let report = match session.check().await {
            Ok(report) => Some(report),
            Err(e) => {
                session.deactivate().await?;
                bail!("Failed to check for updates: {e:#}");
            }
        };

        if let Some(report) = report {
            if !report.update_available {
                match &report.local {
                    Some(installed) => {
                        println!("{}", format!("Already up to date ({installed})").green());
                    }
                    None => {
                        println!(
                            "{}",
                            "Installed version could not be determined; skipping (use --force to reinstall)"
                                .yellow()
                        );
                    }
                }
                return session.deactivate().await;
            }

            let local = report
                .local
                .map_or_else(|| "unknown".to_string(), |v| v.to_string());
            println!(
                "Update available: {} -> {}",
                local.yellow(),
                report.remote.to_string().green().bold()
            );

            if confirm && !prompt_yes_no("Apply the update now?")? {
                println!("{}", "Update declined".yellow());
                return session.deactivate().await;
            }
        }
    }

    let outcome = session.run_cycle_with_force(args.force).await;

    match &outcome {
        UpdateOutcome::Updated(version) => {
            println!("{}", format!("Updated to {version}").green().bold());
            println!("Reload the host application to run the new version.");
            session.deactivate().await
        }
        UpdateOutcome::UpToDate => {
            println!("{}", "Already up to date".green());
            session.deactivate().await
        }
        UpdateOutcome::CheckFailed(reason) => {
            session.deactivate().await?;
            bail!("Update check failed: {reason}");
        }
        UpdateOutcome::WriteFailed(reason) => {
            session.deactivate().await?;
            bail!("Update write failed: {reason}");
        }
    }
}

async fn handle_rollback(target: &UpdateTarget) -> Result<()> {
    println!("{}", "Rolling back to the previous version...".yellow());

    let backup = BackupManager::new(target.install_path());
    if !backup.backup_exists() {
        bail!("No backup found. Cannot rollback.");
    }

    backup
        .restore_backup()
        .await
        .context("Failed to restore from backup")?;

    println!("{}", "Successfully rolled back".green());
    Ok(())
}

async fn show_status(session: &UpdateSession<DetachedHost, HttpSource>) {
    let installed = match session.target().installed().current_version().await {
        Ok(Some(version)) => version.to_string(),
        Ok(None) => "unknown".to_string(),
        Err(_) => "unknown".to_string(),
    };

    match session.check().await {
        Ok(report) if report.update_available => {
            println!("Installed version: {installed}");
            println!(
                "Latest version:    {} (update available)",
                report.remote.to_string().green()
            );
        }
        Ok(report) if installed == "unknown" => {
            println!("Installed version: unknown");
            println!("Latest version:    {}", report.remote);
        }
        Ok(report) => {
            println!("Installed version: {installed} (up to date)");
            println!("Latest version:    {}", report.remote);
        }
        Err(_) => {
            println!("Installed version: {installed}");
            println!("(Unable to check the remote source)");
        }
    }
}

async fn check_for_updates(session: &UpdateSession<DetachedHost, HttpSource>) -> Result<()> {
    println!("{}", "Checking for updates...".cyan());

    match session.check().await {
        Ok(report) if report.update_available => {
            let local = report
                .local
                .map_or_else(|| "unknown".to_string(), |v| v.to_string());
            println!(
                "{}",
                format!("Update available: {local} -> {}", report.remote).green()
            );
            println!("Run `replug update` to install it");
            Ok(())
        }
        Ok(report) => {
            println!(
                "{}",
                format!("You are on the latest version ({})", report.remote).green()
            );
            Ok(())
        }
        Err(e) => bail!("Failed to check for updates: {e:#}"),
    }
}

fn prompt_yes_no(question: &str) -> Result<bool> {
    use std::io::Write;

    print!("{question} [y/N] ");
    std::io::stdout().flush().context("Failed to flush stdout")?;

    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read confirmation")?;

    Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
