//! Page download.
//!
//! Walks the listing in order, names each page after its resolved date and
//! question slug, and stores the raw bytes for later conversion. A failure
//! on one item is logged and counted; the crawl moves on.

use crate::listing::{CapturedItem, DateBook, item_file_stem};
use crate::storage::{Storage, write_atomic};
use crate::timestamp::ReferenceInstant;
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, error, info};

/// Retrieves answer pages.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch the page at `url`.
    async fn fetch_page(&self, url: &str) -> Result<Vec<u8>>;
}

/// Crawl behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlOptions {
    /// Re-download pages that already exist on disk.
    pub overwrite: bool,
}

/// Counts for a finished crawl.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Pages fetched and written.
    pub downloaded: usize,
    /// Pages already on disk.
    pub skipped: usize,
    /// Items that could not be saved.
    pub failed: usize,
    /// Distinct URLs whose date label did not resolve.
    pub undated: usize,
}

/// What happened to one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// Written to this path.
    Downloaded(PathBuf),
    /// Existing file left untouched.
    Skipped(PathBuf),
}

/// Fetch every item of the listing into the raw directory.
///
/// Only failing to create the raw directory is returned as an error;
/// per-item failures are logged and counted in the report.
pub async fn crawl(
    items: &[CapturedItem],
    reference: &ReferenceInstant,
    source: &dyn PageSource,
    storage: &Storage,
    options: CrawlOptions,
) -> Result<CrawlReport> {
    storage.ensure_raw_dir()?;
    let dates = DateBook::resolve_all(items, reference);
    let mut report = CrawlReport {
        undated: dates.unresolved(),
        ..CrawlReport::default()
    };

    let total = items.len();
    for (index, item) in items.iter().enumerate() {
        info!("[{}/{total}] {}", index + 1, item.url);
        match crawl_item(item, &dates, source, storage, options).await {
            Ok(CrawlOutcome::Downloaded(path)) => {
                debug!("saved {}", path.display());
                report.downloaded += 1;
            },
            Ok(CrawlOutcome::Skipped(path)) => {
                debug!("already saved, skipping {}", path.display());
                report.skipped += 1;
            },
            Err(e) => {
                error!(url = %item.url, category = e.category(), "{e}");
                report.failed += 1;
            },
        }
    }

    Ok(report)
}

/// Fetch and store a single item.
pub async fn crawl_item(
    item: &CapturedItem,
    dates: &DateBook,
    source: &dyn PageSource,
    storage: &Storage,
    options: CrawlOptions,
) -> Result<CrawlOutcome> {
    let slug = item
        .slug()
        .ok_or_else(|| Error::InvalidUrl(format!("no question slug in '{}'", item.url)))?;
    let stem = item_file_stem(dates.get(&item.url), &slug);
    let path = storage.raw_page_path(&stem);

    if path.exists() && !options.overwrite {
        return Ok(CrawlOutcome::Skipped(path));
    }

    let body = source.fetch_page(&item.url).await?;
    write_atomic(&path, &body)?;
    Ok(CrawlOutcome::Downloaded(path))
}
