//! Configuration for keepsake runs.
//!
//! Settings are stored in TOML. Every section and field is optional; missing
//! values fall back to the defaults below, and command-line flags override
//! whatever the file says.
//!
//! ## Resolution order
//!
//! 1. `--config <FILE>` or the `KEEPSAKE_CONFIG` environment variable
//! 2. `config.toml` in the platform config directory
//! 3. Built-in defaults
//!
//! ## Example Configuration File
//!
//! ```toml
//! [fetch]
//! delay_secs = 1.5
//! timeout_secs = 30
//!
//! [site]
//! base_url = "https://www.quora.com"
//!
//! [output]
//! raw_dir = "quora-answers"
//! cooked_dir = "quora-answers-cooked"
//!
//! [images]
//! download = true
//! ```
//!
//! ```rust
//! use keepsake_core::Config;
//!
//! let config: Config = toml::from_str("[fetch]\ndelay_secs = 2.0\n")?;
//! assert_eq!(config.fetch.delay_secs, 2.0);
//! assert!(config.images.download);
//! # Ok::<(), toml::de::Error>(())
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "KEEPSAKE_CONFIG";

const CONFIG_FILE_NAME: &str = "config.toml";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// HTTP behaviour.
    pub fetch: FetchSettings,
    /// The platform being preserved.
    pub site: SiteSettings,
    /// Output locations.
    pub output: OutputSettings,
    /// Image localization.
    pub images: ImageSettings,
}

/// HTTP behaviour shared by page and image fetches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Seconds to wait after every network operation.
    ///
    /// Keeps the crawl polite. `0` disables the delay.
    pub delay_secs: f64,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

/// Where the preserved content lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSettings {
    /// Base that site-relative links (`/topic/x`) resolve against.
    pub base_url: String,
}

/// Output directories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Raw pages written by `crawl` and read by `convert`.
    pub raw_dir: PathBuf,
    /// Standalone documents written by `convert`.
    pub cooked_dir: PathBuf,
}

/// Image localization settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    /// Download embedded images next to each document.
    pub download: bool,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            delay_secs: 0.0,
            timeout_secs: 30,
            user_agent: format!("keepsake/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.quora.com".to_string(),
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("quora-answers"),
            cooked_dir: PathBuf::from("quora-answers-cooked"),
        }
    }
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self { download: true }
    }
}

impl FetchSettings {
    /// Inter-request delay. Non-finite or negative values mean no delay.
    pub fn delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.delay_secs).unwrap_or(Duration::ZERO)
    }

    /// Per-request timeout.
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration, honouring an explicit path first.
    ///
    /// With `explicit` set, that file must exist. Otherwise
    /// [`CONFIG_ENV`] is consulted, then the platform config directory. A
    /// missing platform file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if:
    /// - An explicitly named file cannot be read
    /// - A file contains invalid TOML or invalid values
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
            return Self::load_from(Path::new(&path));
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load and validate a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse config {}: {e}", path.display()))
        })?;
        config.validate()?;
        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Platform location of the config file, when one can be determined.
    ///
    /// - Linux: `~/.config/keepsake/config.toml`
    /// - macOS: `~/Library/Application Support/dev.keepsake.keepsake/config.toml`
    /// - Windows: `%APPDATA%\keepsake\keepsake\config\config.toml`
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "keepsake", "keepsake")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Check values that deserialize but cannot be used.
    pub fn validate(&self) -> Result<()> {
        if !self.fetch.delay_secs.is_finite() || self.fetch.delay_secs < 0.0 {
            return Err(Error::Config(format!(
                "fetch.delay_secs must be a non-negative number, got {}",
                self.fetch.delay_secs
            )));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(Error::Config("fetch.timeout_secs must be positive".into()));
        }
        self.site_base()?;
        Ok(())
    }

    /// [`SiteSettings::base_url`] parsed.
    pub fn site_base(&self) -> Result<Url> {
        Url::parse(&self.site.base_url).map_err(|e| {
            Error::Config(format!("site.base_url '{}' is not a URL: {e}", self.site.base_url))
        })
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config_values() {
        let config = Config::default();
        assert_eq!(config.fetch.delay_secs, 0.0);
        assert_eq!(config.fetch.timeout_secs, 30);
        assert!(config.fetch.user_agent.starts_with("keepsake/"));
        assert_eq!(config.site.base_url, "https://www.quora.com");
        assert_eq!(config.output.raw_dir, PathBuf::from("quora-answers"));
        assert_eq!(config.output.cooked_dir, PathBuf::from("quora-answers-cooked"));
        assert!(config.images.download);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let file = write_config("[fetch]\ndelay_secs = 1.5\n\n[images]\ndownload = false\n");
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.fetch.delay(), Duration::from_millis(1500));
        assert_eq!(config.fetch.timeout_secs, 30);
        assert!(!config.images.download);
        assert_eq!(config.output, OutputSettings::default());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let file = write_config("[fetch\ndelay_secs = ");
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(err.scope(), crate::ErrorScope::Fatal);
    }

    #[test]
    fn test_invalid_values_rejected() {
        for content in [
            "[fetch]\ndelay_secs = -1.0\n",
            "[fetch]\ntimeout_secs = 0\n",
            "[site]\nbase_url = \"not a url\"\n",
        ] {
            let file = write_config(content);
            assert!(
                matches!(Config::load(Some(file.path())), Err(Error::Config(_))),
                "{content}"
            );
        }
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let err = Config::load(Some(Path::new("/no/such/keepsake.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = Config::default();
        config.fetch.delay_secs = 0.25;
        config.output.raw_dir = PathBuf::from("/tmp/raw");
        let rendered = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_delay_never_panics_on_odd_values() {
        let settings = FetchSettings {
            delay_secs: f64::NAN,
            ..FetchSettings::default()
        };
        assert_eq!(settings.delay(), Duration::ZERO);
    }
}
