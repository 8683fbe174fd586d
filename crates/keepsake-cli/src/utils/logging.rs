//! Logging initialization.

use anyhow::Result;
use colored::control as color_control;
use tracing_subscriber::FmtSubscriber;

use crate::args::Verbosity;

/// Install the global tracing subscriber, writing to stderr.
///
/// # Errors
///
/// Returns an error if the global tracing subscriber cannot be set.
pub fn initialize_logging(verbosity: Verbosity) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(verbosity.level())
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    if std::env::var_os("NO_COLOR").is_some() {
        color_control::set_override(false);
    }
    Ok(())
}
