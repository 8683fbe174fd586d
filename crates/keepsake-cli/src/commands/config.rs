//! Config command implementation

use anyhow::Result;
use keepsake_core::Config;
use std::path::Path;

/// Print the effective configuration as TOML.
pub fn execute(config: &Config, explicit: Option<&Path>) -> Result<()> {
    let source = explicit
        .map(Path::to_path_buf)
        .or_else(|| Config::default_path().filter(|p| p.exists()))
        .map_or_else(|| "built-in defaults".to_string(), |p| p.display().to_string());
    println!("# source: {source}");
    print!("{}", config.to_toml()?);
    Ok(())
}
