//! Crawl command implementation

use anyhow::{Context, Result};
use colored::Colorize;
use keepsake_core::timestamp::ReferenceInstant;
use keepsake_core::{Config, CrawlOptions, Fetcher, Storage, crawl, load_listing};
use std::path::Path;
use tracing::info;

use crate::args::Verbosity;

/// Execute the crawl command
pub async fn execute(
    config: &Config,
    input: &Path,
    reference: ReferenceInstant,
    options: CrawlOptions,
    verbosity: Verbosity,
) -> Result<()> {
    let items = load_listing(input)?;
    info!(
        "{} items in {}, captured at {} (offset {} min)",
        items.len(),
        input.display(),
        reference.epoch_seconds,
        reference.timezone_offset_minutes
    );

    let fetcher = Fetcher::new(&config.fetch).context("failed to build HTTP client")?;
    let storage = Storage::from_settings(&config.output);
    let report = crawl(&items, &reference, &fetcher, &storage, options).await?;

    if !verbosity.is_quiet() {
        println!(
            "\nSummary: {} downloaded, {} skipped, {} failed{}",
            report.downloaded.to_string().green(),
            report.skipped,
            if report.failed > 0 {
                report.failed.to_string().red()
            } else {
                report.failed.to_string().normal()
            },
            if report.undated > 0 {
                format!(", {} undated", report.undated.to_string().yellow())
            } else {
                String::new()
            }
        );
        println!("Raw pages in {}", storage.raw_dir().display());
    }
    Ok(())
}
