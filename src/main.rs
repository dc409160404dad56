//! replug CLI entry point.
//!
//! Parses command-line arguments, executes the requested command, and
//! renders failures as user-friendly errors with suggestions.

use anyhow::Result;
use clap::Parser;
use replug::cli::Cli;
use replug::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
