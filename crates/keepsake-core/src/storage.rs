use crate::config::OutputSettings;
use crate::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

const PAGE_EXTENSION: &str = "html";
const SIDECAR_EXTENSION: &str = "json";

/// On-disk layout of a keepsake run.
///
/// ```text
/// <raw_dir>/<stem>.html          page as fetched by `crawl`
/// <cooked_dir>/<stem>.html       standalone document
/// <cooked_dir>/<stem>.json       sidecar metadata
/// <cooked_dir>/<stem>_files/     localized images
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Storage {
    raw_dir: PathBuf,
    cooked_dir: PathBuf,
}

impl Storage {
    /// Storage rooted at explicit directories.
    pub fn new(raw_dir: impl Into<PathBuf>, cooked_dir: impl Into<PathBuf>) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            cooked_dir: cooked_dir.into(),
        }
    }

    /// Storage at the configured output directories.
    pub fn from_settings(settings: &OutputSettings) -> Self {
        Self::new(&settings.raw_dir, &settings.cooked_dir)
    }

    /// Directory holding fetched pages.
    pub fn raw_dir(&self) -> &Path {
        &self.raw_dir
    }

    /// Directory holding converted documents.
    pub fn cooked_dir(&self) -> &Path {
        &self.cooked_dir
    }

    /// Where `crawl` stores the page for `stem`.
    pub fn raw_page_path(&self, stem: &str) -> PathBuf {
        self.raw_dir.join(format!("{stem}.{PAGE_EXTENSION}"))
    }

    /// Where `convert` writes the document for `stem`.
    pub fn document_path(&self, stem: &str) -> PathBuf {
        self.cooked_dir.join(format!("{stem}.{PAGE_EXTENSION}"))
    }

    /// Where `convert` writes the sidecar for `stem`.
    pub fn sidecar_path(&self, stem: &str) -> PathBuf {
        self.cooked_dir.join(format!("{stem}.{SIDECAR_EXTENSION}"))
    }

    /// Create the raw directory (owner-only on Unix).
    pub fn ensure_raw_dir(&self) -> Result<()> {
        ensure_private_dir(&self.raw_dir)
    }

    /// Create the cooked directory (owner-only on Unix).
    pub fn ensure_cooked_dir(&self) -> Result<()> {
        ensure_private_dir(&self.cooked_dir)
    }

    /// Fetched pages in file-name order.
    ///
    /// A missing directory or one without any `.html` file means there is
    /// nothing to convert, which is a [`Error::Listing`] failure.
    pub fn list_raw_pages(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.raw_dir).map_err(|e| {
            Error::Listing(format!("cannot read {}: {e}", self.raw_dir.display()))
        })?;

        let mut pages = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_page = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(PAGE_EXTENSION));
            if is_page && path.is_file() {
                pages.push(path);
            }
        }
        if pages.is_empty() {
            return Err(Error::Listing(format!(
                "no .{PAGE_EXTENSION} files in {}",
                self.raw_dir.display()
            )));
        }
        pages.sort();
        debug!("found {} raw pages in {}", pages.len(), self.raw_dir.display());
        Ok(pages)
    }
}

/// The file stem of a page path, used as the item's identity during conversion.
pub fn page_stem(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|stem| stem.to_str())
}

/// Write `bytes` to `target` through a temp file in the same directory.
///
/// The parent directory is created if needed. An interrupted write never
/// leaves a truncated file at `target`.
pub fn write_atomic(target: &Path, bytes: &[u8]) -> Result<()> {
    let parent = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.persist(target).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// Reduce `name` to `[A-Za-z0-9._-]`, replacing anything else with `_`.
///
/// `..` sequences are collapsed as well, so the result is always a single
/// path component.
pub fn safe_component(name: &str) -> String {
    let mut sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    while sanitized.contains("..") {
        sanitized = sanitized.replace("..", "_");
    }

    if sanitized.is_empty() {
        "_".to_string()
    } else {
        sanitized
    }
}

fn ensure_private_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
    }
    Ok(())
}
