//! The input listing and per-item identity.
//!
//! A listing is the JSON array captured from the profile page:
//!
//! ```json
//! [["https://www.quora.com/Why-is-the-sky-blue/answer/Jane-Doe", "Added Fri"]]
//! ```
//!
//! Items are identified by URL. Dates are resolved up front into a
//! [`DateBook`] and looked up by URL, so the fetch order never matters.

use crate::timestamp::{self, ReferenceInstant};
use crate::{Error, Result};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;
use url::Url;

/// Date prefix used in file names when the label could not be resolved.
pub const UNKNOWN_DATE: &str = "xxxx-xx-xx";

/// Longest file name (in bytes) produced for a document, extension included.
pub const MAX_FILE_NAME_BYTES: usize = 255;

const DOCUMENT_EXTENSION: &str = ".html";

const DECORATORS: &[&str] = &["Added ", "Updated ", "Answered ", "Edited ", "Written "];

/// One entry of the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedItem {
    /// Answer page URL.
    pub url: String,
    /// Relative date label as captured, decorator included.
    pub label: String,
}

impl CapturedItem {
    /// The label with its decorator removed.
    pub fn date_token(&self) -> &str {
        strip_decorator(&self.label)
    }

    /// Resolve the label against `reference`.
    pub fn resolve_date(&self, reference: &ReferenceInstant) -> Result<NaiveDate> {
        timestamp::resolve(self.date_token(), reference)
    }

    /// Question slug of the URL, see [`question_slug`].
    pub fn slug(&self) -> Option<String> {
        question_slug(&self.url)
    }
}

/// Parse listing JSON.
///
/// Anything other than an array of two-string arrays is an [`Error::Listing`].
pub fn parse_listing(json: &str) -> Result<Vec<CapturedItem>> {
    let pairs: Vec<(String, String)> = serde_json::from_str(json)
        .map_err(|e| Error::Listing(format!("expected [[url, label], ...]: {e}")))?;
    Ok(pairs
        .into_iter()
        .map(|(url, label)| CapturedItem { url, label })
        .collect())
}

/// Read and parse a listing file.
pub fn load_listing(path: &Path) -> Result<Vec<CapturedItem>> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| Error::Listing(format!("cannot read {}: {e}", path.display())))?;
    parse_listing(&json)
}

/// Remove a leading decorator such as `Added ` and surrounding whitespace.
pub fn strip_decorator(label: &str) -> &str {
    let label = label.trim_start();
    for decorator in DECORATORS {
        if let Some(prefix) = label.get(..decorator.len()) {
            if prefix.eq_ignore_ascii_case(decorator) {
                return label[decorator.len()..].trim();
            }
        }
    }
    label.trim_end()
}

/// The question part of an answer URL.
///
/// Handles `/<Question>/answer/<Author>` as well as
/// `/topic/<Question>/answer/<Author>`: the slug is the path segment right
/// before `answer`.
///
/// ```rust
/// use keepsake_core::listing::question_slug;
///
/// assert_eq!(
///     question_slug("https://www.quora.com/Why-is-the-sky-blue/answer/Jane-Doe").as_deref(),
///     Some("Why-is-the-sky-blue")
/// );
/// assert_eq!(question_slug("https://www.quora.com/profile/Jane-Doe"), None);
/// ```
pub fn question_slug(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segments: Vec<&str> = parsed.path_segments()?.collect();
    let answer = segments.iter().position(|s| *s == "answer")?;
    let slug = segments.get(answer.checked_sub(1)?)?;
    (!slug.is_empty()).then(|| (*slug).to_string())
}

/// File stem for an item: `"<YYYY-MM-DD> <slug>"`.
///
/// Unresolved dates use [`UNKNOWN_DATE`]. The stem is cut on a character
/// boundary so that stem plus `.html` fits in [`MAX_FILE_NAME_BYTES`].
pub fn item_file_stem(date: Option<NaiveDate>, slug: &str) -> String {
    let date = date.map_or_else(
        || UNKNOWN_DATE.to_string(),
        |d| d.format("%Y-%m-%d").to_string(),
    );
    let mut stem = format!("{date} {slug}");
    let limit = MAX_FILE_NAME_BYTES - DOCUMENT_EXTENSION.len();
    if stem.len() > limit {
        let mut cut = limit;
        while !stem.is_char_boundary(cut) {
            cut -= 1;
        }
        stem.truncate(cut);
    }
    stem
}

/// Date recorded in a stem, if it has one.
pub fn stem_date(stem: &str) -> Option<NaiveDate> {
    let prefix = stem.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

/// Resolved dates keyed by item URL.
#[derive(Debug, Clone, Default)]
pub struct DateBook {
    dates: HashMap<String, Option<NaiveDate>>,
}

impl DateBook {
    /// Resolve every item's label against `reference`.
    ///
    /// Labels that do not resolve are logged as warnings and recorded as
    /// unset. The first entry wins when a URL appears twice.
    pub fn resolve_all(items: &[CapturedItem], reference: &ReferenceInstant) -> Self {
        let mut dates = HashMap::with_capacity(items.len());
        for item in items {
            if dates.contains_key(&item.url) {
                continue;
            }
            let date = match item.resolve_date(reference) {
                Ok(date) => Some(date),
                Err(e) => {
                    warn!(url = %item.url, label = %item.label, "date left unset: {e}");
                    None
                },
            };
            dates.insert(item.url.clone(), date);
        }
        Self { dates }
    }

    /// Resolved date of the item with this URL.
    pub fn get(&self, url: &str) -> Option<NaiveDate> {
        self.dates.get(url).copied().flatten()
    }

    /// Number of URLs whose date could not be resolved.
    pub fn unresolved(&self) -> usize {
        self.dates.values().filter(|date| date.is_none()).count()
    }

    /// Number of distinct URLs.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether no URLs are recorded.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}
