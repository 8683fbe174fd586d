//! keepsake CLI - back up authored answers as portable HTML
//!
//! Parses the command line, loads configuration, applies flag overrides and
//! dispatches to the command implementations. Item-level failures are
//! handled inside the core; anything that reaches [`run`] ends the process.

use anyhow::Result;
use clap::Parser;
use keepsake_core::{Config, CrawlOptions};
use std::path::PathBuf;
use tracing::debug;

pub mod args;
mod cli;
mod commands;
mod utils;

use crate::args::Verbosity;
use crate::utils::{initialize_logging, reference_instant};
use cli::{Cli, Commands};

/// Execute the keepsake CLI with the currently configured environment.
///
/// # Errors
///
/// Returns an error if configuration cannot be loaded or a command fails
/// as a whole (unreadable listing, nothing to convert, unwritable output).
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    initialize_logging(verbosity)?;
    debug!("verbosity: {verbosity}");

    let mut config = Config::load(cli.config.as_deref())?;
    execute_command(cli, &mut config, verbosity).await
}

async fn execute_command(cli: Cli, config: &mut Config, verbosity: Verbosity) -> Result<()> {
    match cli.command {
        Commands::Crawl {
            input,
            output_dir,
            origin,
            delay,
            overwrite,
        } => {
            apply_overrides(config, output_dir, None, delay)?;
            commands::crawl_listing(
                config,
                &input,
                reference_instant(origin),
                CrawlOptions { overwrite },
                verbosity,
            )
            .await
        },
        Commands::Convert {
            input_dir,
            output_dir,
            delay,
            no_download,
        } => {
            apply_overrides(config, input_dir, output_dir, delay)?;
            if no_download {
                config.images.download = false;
            }
            commands::convert_pages(config, verbosity).await
        },
        Commands::Date {
            tokens,
            origin,
            format,
        } => commands::resolve_dates(&tokens, reference_instant(origin), format),
        Commands::Config => commands::show_config(config, cli.config.as_deref()),
    }
}

fn apply_overrides(
    config: &mut Config,
    raw_dir: Option<PathBuf>,
    cooked_dir: Option<PathBuf>,
    delay: Option<f64>,
) -> Result<()> {
    if let Some(dir) = raw_dir {
        config.output.raw_dir = dir;
    }
    if let Some(dir) = cooked_dir {
        config.output.cooked_dir = dir;
    }
    if let Some(secs) = delay {
        config.fetch.delay_secs = secs;
    }
    config.validate()?;
    Ok(())
}
