//! Date command implementation

use anyhow::Result;
use keepsake_core::listing::{UNKNOWN_DATE, strip_decorator};
use keepsake_core::timestamp::{ReferenceInstant, resolve};
use serde::Serialize;
use tracing::warn;

use crate::args::OutputFormat;

#[derive(Debug, Serialize)]
struct Resolution<'a> {
    token: &'a str,
    date: Option<String>,
}

/// Resolve each label against `reference` and print one line per label.
///
/// Labels that do not resolve are reported with a warning and printed with
/// the unknown-date marker; they do not fail the command.
pub fn execute(tokens: &[String], reference: ReferenceInstant, format: OutputFormat) -> Result<()> {
    let resolutions: Vec<Resolution<'_>> = tokens
        .iter()
        .map(|token| {
            let date = match resolve(strip_decorator(token), &reference) {
                Ok(date) => Some(date.to_string()),
                Err(e) => {
                    warn!(token = token.as_str(), "{e}");
                    None
                },
            };
            Resolution { token, date }
        })
        .collect();

    match format {
        OutputFormat::Text => {
            for r in &resolutions {
                println!("{}\t{}", r.token, r.date.as_deref().unwrap_or(UNKNOWN_DATE));
            }
        },
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&resolutions)?);
        },
    }
    Ok(())
}
