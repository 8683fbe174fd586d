//! Output verbosity.
//!
//! | Level | Log filter | Use Case |
//! |-------|------------|----------|
//! | `Quiet` | errors | Scripts, CI |
//! | `Normal` | info and warnings | Interactive use |
//! | `Verbose` | debug | Reproducing a sanitizer report |

use tracing::Level;

/// Verbosity level for CLI output.
///
/// Levels are ordered from quietest to most verbose.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Progress, warnings and the run summary.
    #[default]
    Normal,
    /// Everything, including debug traces of dropped markup.
    Verbose,
}

impl Verbosity {
    /// Create a Verbosity from the global flags. Verbose wins over quiet.
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: bool) -> Self {
        if verbose {
            Self::Verbose
        } else if quiet {
            Self::Quiet
        } else {
            Self::Normal
        }
    }

    /// Maximum tracing level to install.
    #[must_use]
    pub const fn level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
        }
    }

    /// Check if output should be suppressed (quiet mode).
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }
}

impl std::fmt::Display for Verbosity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Quiet => write!(f, "quiet"),
            Self::Normal => write!(f, "normal"),
            Self::Verbose => write!(f, "verbose"),
        }
    }
}
