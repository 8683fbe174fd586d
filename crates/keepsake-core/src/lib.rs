//! # keepsake-core
//!
//! Core functionality for keepsake - offline preservation of answers written
//! on a hosted Q&A platform.
//!
//! A run has two phases. **Crawl** reads a captured listing of
//! `[url, relative-date]` pairs, resolves each relative date against the
//! moment the listing was captured, and downloads the raw pages. **Convert**
//! isolates the authored answer inside each page, strips it down to a small
//! whitelist of markup, downloads its images, and writes a standalone HTML
//! document with a JSON sidecar.
//!
//! ## Architecture
//!
//! - **Timestamps** ([`timestamp`]): relative labels (`Fri`, `Yesterday`,
//!   `3h ago`) to calendar dates, in the viewer's local calendar
//! - **Listing** ([`listing`]): input parsing, file naming, URL-keyed dates
//! - **Tree** ([`tree`]): owned document tree built from an HTML5 parse
//! - **Locator** ([`locate`]): finds the content container by fingerprint
//! - **Policy / Sanitizer** ([`policy`], [`sanitize`]): one static whitelist
//!   table and the traversal that applies it
//! - **Localizer** ([`localize`]): image downloads with remote fallback
//! - **Emitter** ([`emit`]): standalone document and sidecar
//! - **Orchestration** ([`crawl`], [`pipeline`]): per-item error isolation
//!
//! ## Quick Start
//!
//! ```rust
//! use keepsake_core::policy::SanitizationPolicy;
//! use keepsake_core::sanitize::{SanitizeContext, sanitize};
//! use keepsake_core::tree::parse_fragment;
//! use url::Url;
//!
//! let base = Url::parse("https://www.quora.com")?;
//! let ctx = SanitizeContext { label: "example", site_base: &base };
//! let input = parse_fragment(r#"<div class="x"><p style="a">Hi <a href="/About">there</a></p></div>"#)?;
//!
//! let out = sanitize(&input, SanitizationPolicy::standard(), &ctx)?;
//! assert_eq!(
//!     out.fragment.to_html(),
//!     r#"<p>Hi <a href="https://www.quora.com/About">there</a></p>"#
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`]. Each error has an
//! [`ErrorScope`] that tells the caller how far it may travel: fatal errors
//! end the run, item errors end one page, feature errors only degrade it.

/// Configuration file and defaults
pub mod config;
/// Page download
pub mod crawl;
/// Standalone document output
pub mod emit;
/// Error types and result aliases
pub mod error;
/// HTTP client with rate limiting
pub mod fetcher;
/// Input listing and item naming
pub mod listing;
/// Image localization
pub mod localize;
/// Content-container location
pub mod locate;
/// Page conversion pipeline
pub mod pipeline;
/// Sanitization whitelist
pub mod policy;
/// Whitelist-driven tree transformation
pub mod sanitize;
/// On-disk layout
pub mod storage;
/// Relative timestamp resolution
pub mod timestamp;
/// Owned document tree
pub mod tree;

pub use config::Config;
pub use crawl::{CrawlOptions, CrawlReport, PageSource, crawl};
pub use error::{Error, ErrorScope, Result};
pub use fetcher::{Fetcher, RateLimit};
pub use listing::{CapturedItem, DateBook, load_listing};
pub use localize::{ImageFetcher, ImageReference};
pub use pipeline::{ConvertReport, Converter};
pub use policy::{POLICY_VERSION, SanitizationPolicy};
pub use storage::Storage;
pub use timestamp::ReferenceInstant;
