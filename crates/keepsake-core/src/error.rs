//! Error types and handling for keepsake-core operations.
//!
//! Every failure in the preservation pipeline maps onto one variant of
//! [`Error`]. Variants are grouped by *scope*, which decides how far a failure
//! is allowed to travel:
//!
//! - **Fatal**: the run cannot process anything (unreadable listing, broken
//!   configuration). Propagates to `main`.
//! - **Item**: one page cannot be preserved (content container missing,
//!   malformed tree, primary page fetch failed). Caught at the item boundary.
//! - **Feature**: one feature of an item degrades (date left unset, image left
//!   remote). Reported, never aborts the item.
//!
//! ```rust
//! use keepsake_core::{Error, ErrorScope};
//!
//! let err = Error::UnrecognizedToken("Someday".to_string());
//! assert_eq!(err.scope(), ErrorScope::Feature);
//! assert_eq!(err.category(), "date");
//! ```

use thiserror::Error;

/// The main error type for keepsake-core operations.
///
/// All public functions in keepsake-core return `Result<T, Error>`. The
/// underlying I/O and HTTP errors are preserved through `source()`.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed.
    ///
    /// Covers reading raw pages, writing converted documents, and creating
    /// asset directories.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network operation failed before a response was received.
    ///
    /// Connection resets and timeouts are recoverable; malformed requests are
    /// not.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The input listing is unreadable or has the wrong shape.
    ///
    /// The listing must be a JSON array of `[url, label]` string pairs. Any
    /// deviation aborts the run because no item can be trusted.
    #[error("Listing error: {0}")]
    Listing(String),

    /// Configuration is invalid or inaccessible.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No known content-container fingerprint matched the page.
    ///
    /// The page layout has drifted past every fingerprint in the locator
    /// table, or the page is not an answer page at all.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The document tree cannot be traversed.
    ///
    /// Raised for trees that exceed the traversal depth limit or carry
    /// element names that are not valid markup identifiers.
    #[error("Malformed tree: {0}")]
    MalformedTree(String),

    /// A relative date label matched none of the recognized token forms.
    #[error("Unrecognized date token: '{0}'")]
    UnrecognizedToken(String),

    /// A remote resource responded, but not with usable content.
    #[error("Fetch failed for '{url}': {reason}")]
    Fetch {
        /// URL that was requested.
        url: String,
        /// Status or transport reason for the failure.
        reason: String,
    },

    /// URL is malformed or cannot be resolved.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic error for uncategorized failures.
    #[error("{0}")]
    Other(String),
}

/// How far a failure is allowed to propagate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorScope {
    /// Nothing can be processed; abort the run.
    Fatal,
    /// This item is abandoned; the run continues with the next one.
    Item,
    /// A single feature of the item degrades; the item is still produced.
    Feature,
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

impl Error {
    /// Check if the error might be recoverable through a retry.
    ///
    /// ```rust
    /// use keepsake_core::Error;
    /// use std::io;
    ///
    /// assert!(Error::Io(io::Error::new(io::ErrorKind::TimedOut, "slow")).is_recoverable());
    /// assert!(!Error::NotFound("no answer".into()).is_recoverable());
    /// ```
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }

    /// Get the error category as a string identifier for log fields.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Network(_) => "network",
            Self::Listing(_) => "listing",
            Self::Config(_) => "config",
            Self::NotFound(_) => "not_found",
            Self::MalformedTree(_) => "malformed_tree",
            Self::UnrecognizedToken(_) => "date",
            Self::Fetch { .. } => "fetch",
            Self::InvalidUrl(_) => "invalid_url",
            Self::Serialization(_) => "serialization",
            Self::Other(_) => "other",
        }
    }

    /// Default propagation scope for this error.
    ///
    /// Callers that know better may narrow the scope: an image fetch that
    /// fails with [`Error::Fetch`] is a feature-level warning even though a
    /// page fetch failing the same way aborts the item.
    #[must_use]
    pub const fn scope(&self) -> ErrorScope {
        match self {
            Self::Listing(_) | Self::Config(_) => ErrorScope::Fatal,
            Self::UnrecognizedToken(_) => ErrorScope::Feature,
            _ => ErrorScope::Item,
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
