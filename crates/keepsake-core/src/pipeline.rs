//! Conversion of fetched pages into standalone documents.
//!
//! Per page: parse, locate the content container, sanitize, localize images
//! (when a fetcher is configured), emit. Each page is an isolated unit; an
//! error on one is logged and the next page proceeds.

use crate::emit::{Emitted, Sidecar, StandaloneDocument, emit};
use crate::listing::stem_date;
use crate::localize::{AssetDir, ImageFetcher, ImageReference, localize, remote_images};
use crate::policy::SanitizationPolicy;
use crate::sanitize::{SanitizeContext, sanitize_element};
use crate::storage::{Storage, page_stem};
use crate::{Result, locate, tree};
use tracing::{error, info};
use url::Url;

/// Result of converting one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedItem {
    /// Item identity (raw file stem).
    pub stem: String,
    /// Written files.
    pub emitted: Emitted,
    /// Facts recorded in the sidecar.
    pub sidecar: Sidecar,
    /// Images fetched over the network for this item.
    pub downloaded: usize,
}

/// Counts for a finished conversion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertReport {
    /// Documents written.
    pub converted: usize,
    /// Pages abandoned with an error.
    pub failed: usize,
    /// Degraded features across all written documents.
    pub warnings: usize,
    /// Images fetched over the network.
    pub images_downloaded: usize,
}

/// Converts raw pages from a [`Storage`] layout.
pub struct Converter<'a> {
    storage: &'a Storage,
    policy: &'a SanitizationPolicy,
    site_base: Url,
    images: Option<&'a dyn ImageFetcher>,
}

impl<'a> Converter<'a> {
    /// Converter using the standard policy and no image downloads.
    pub fn new(storage: &'a Storage, site_base: Url) -> Self {
        Self {
            storage,
            policy: SanitizationPolicy::standard(),
            site_base,
            images: None,
        }
    }

    /// Download images through `fetcher`.
    #[must_use]
    pub fn with_images(mut self, fetcher: &'a dyn ImageFetcher) -> Self {
        self.images = Some(fetcher);
        self
    }

    /// Use a different sanitization policy.
    #[must_use]
    pub fn with_policy(mut self, policy: &'a SanitizationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Convert every raw page.
    ///
    /// Fails only when there is nothing to convert or the output directory
    /// cannot be created.
    pub async fn convert_all(&self) -> Result<ConvertReport> {
        let pages = self.storage.list_raw_pages()?;
        self.storage.ensure_cooked_dir()?;

        let mut report = ConvertReport::default();
        let total = pages.len();
        for (index, path) in pages.iter().enumerate() {
            let Some(stem) = page_stem(path) else {
                error!(file = %path.display(), "file name is not valid UTF-8");
                report.failed += 1;
                continue;
            };
            info!("[{}/{total}] {stem}", index + 1);

            let result = match std::fs::read(path) {
                Ok(raw) => self.convert_page(&raw, stem).await,
                Err(e) => Err(e.into()),
            };
            match result {
                Ok(item) => {
                    report.converted += 1;
                    report.warnings += item.sidecar.warnings;
                    report.images_downloaded += item.downloaded;
                },
                Err(e) => {
                    error!(item = stem, category = e.category(), "{e}");
                    report.failed += 1;
                },
            }
        }

        Ok(report)
    }

    /// Convert one page held in memory and write its outputs.
    pub async fn convert_page(&self, raw: &[u8], stem: &str) -> Result<ConvertedItem> {
        let html = String::from_utf8_lossy(raw);
        let document = tree::parse_document(&html)?;
        let located = locate::locate(&document)?;

        let ctx = SanitizeContext {
            label: stem,
            site_base: &self.site_base,
        };
        let sanitized = sanitize_element(located.content, self.policy, &ctx)?;
        let mut warnings = sanitized.unrecognized.len();

        let (body, images, downloaded) = match self.images {
            Some(fetcher) => {
                let assets = AssetDir::for_document(self.storage.cooked_dir(), stem);
                let localized = localize(sanitized.fragment, fetcher, &assets, stem).await;
                warnings += localized.unresolved();
                (localized.fragment, localized.images, localized.downloaded)
            },
            None => {
                let images = remote_images(&sanitized.fragment)
                    .into_iter()
                    .map(|source_url| ImageReference {
                        source_url,
                        local_path: None,
                    })
                    .collect();
                (sanitized.fragment, images, 0)
            },
        };

        let title = document.title();
        let sidecar = Sidecar {
            url: document.canonical_url(),
            title: title.clone(),
            date: stem_date(stem),
            images,
            warnings,
            policy_version: self.policy.version(),
        };
        let emitted = emit(
            self.storage,
            stem,
            &StandaloneDocument {
                title: title.as_deref(),
                body: &body,
            },
            &sidecar,
        )?;

        Ok(ConvertedItem {
            stem: stem.to_string(),
            emitted,
            sidecar,
            downloaded,
        })
    }
}
