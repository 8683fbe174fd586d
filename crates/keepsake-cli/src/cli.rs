//! # CLI Structure and Argument Parsing
//!
//! `keepsake` runs in two phases, each its own subcommand:
//!
//! ```bash
//! # Download every page named in a captured listing
//! keepsake crawl answers.json -t 1704448800000 -z -60 --delay 1.5
//!
//! # Turn downloaded pages into standalone documents
//! keepsake convert quora-answers quora-answers-cooked
//!
//! # Check how labels resolve without fetching anything
//! keepsake date Fri Yesterday "3h ago" -t 1704448800000 -z 0
//! ```
//!
//! Flags override the values from the configuration file.

use clap::{Args, Parser, Subcommand};
use keepsake_core::config::CONFIG_ENV;
use std::path::PathBuf;

use crate::args::OutputFormat;

/// Main CLI structure for the `keepsake` command
#[derive(Parser, Clone, Debug)]
#[command(name = "keepsake")]
#[command(version)]
#[command(about = "keepsake - back up authored answers as portable HTML", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Show debug output
    #[arg(short = 'v', long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only show errors
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Configuration file to use instead of the platform default
    #[arg(long, global = true, env = CONFIG_ENV, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Reference instant flags shared by commands that resolve relative dates.
///
/// Either value may be omitted; the missing half comes from the system clock.
#[derive(Args, Clone, Copy, Debug, Default)]
pub struct OriginArgs {
    /// Capture time of the listing, in milliseconds since the epoch
    #[arg(short = 't', long = "origin-timestamp", value_name = "MILLIS")]
    pub timestamp: Option<i64>,

    /// Timezone offset at capture, as `Date.getTimezoneOffset()` reports it
    #[arg(
        short = 'z',
        long = "origin-timezone",
        value_name = "MINUTES",
        allow_negative_numbers = true
    )]
    pub timezone: Option<i32>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Download the pages named in a captured listing
    Crawl {
        /// JSON listing of `[url, label]` pairs
        input: PathBuf,

        /// Directory for raw pages (defaults to `output.raw_dir`)
        output_dir: Option<PathBuf>,

        #[command(flatten)]
        origin: OriginArgs,

        /// Seconds to wait after each request
        #[arg(long, value_name = "SECONDS")]
        delay: Option<f64>,

        /// Re-download pages that are already on disk
        #[arg(long)]
        overwrite: bool,
    },

    /// Convert downloaded pages into standalone documents
    Convert {
        /// Directory of raw pages (defaults to `output.raw_dir`)
        input_dir: Option<PathBuf>,

        /// Directory for documents (defaults to `output.cooked_dir`)
        output_dir: Option<PathBuf>,

        /// Seconds to wait after each image request
        #[arg(long, value_name = "SECONDS")]
        delay: Option<f64>,

        /// Keep images remote instead of downloading them
        #[arg(long)]
        no_download: bool,
    },

    /// Resolve relative date labels
    Date {
        /// Labels as shown in the listing, e.g. `Fri` or `"Added 3h ago"`
        #[arg(required = true)]
        tokens: Vec<String>,

        #[command(flatten)]
        origin: OriginArgs,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the effective configuration
    Config,
}
