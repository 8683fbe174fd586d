//! Shared argument types.

mod verbosity;

pub use verbosity::Verbosity;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Output format for command results.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text (default).
    #[default]
    Text,
    /// JSON for scripting.
    Json,
}
