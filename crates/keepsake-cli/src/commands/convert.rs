//! Convert command implementation

use anyhow::{Context, Result};
use colored::Colorize;
use keepsake_core::{Config, Converter, Fetcher, Storage};

use crate::args::Verbosity;

/// Execute the convert command
pub async fn execute(config: &Config, verbosity: Verbosity) -> Result<()> {
    let storage = Storage::from_settings(&config.output);
    let site_base = config.site_base()?;

    let report = if config.images.download {
        let fetcher = Fetcher::new(&config.fetch).context("failed to build HTTP client")?;
        Converter::new(&storage, site_base)
            .with_images(&fetcher)
            .convert_all()
            .await?
    } else {
        Converter::new(&storage, site_base).convert_all().await?
    };

    if !verbosity.is_quiet() {
        println!(
            "\nSummary: {} converted, {} failed, {} warnings, {} images downloaded",
            report.converted.to_string().green(),
            if report.failed > 0 {
                report.failed.to_string().red()
            } else {
                report.failed.to_string().normal()
            },
            if report.warnings > 0 {
                report.warnings.to_string().yellow()
            } else {
                report.warnings.to_string().normal()
            },
            report.images_downloaded
        );
        println!("Documents in {}", storage.cooked_dir().display());
    }
    Ok(())
}
