#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use tempfile::TempDir;

#[allow(dead_code)]
pub const CMD_TIMEOUT: Duration = Duration::from_secs(15);

/// Friday 2024-01-05 10:00:00 UTC, as `Date.now()` would report it.
#[allow(dead_code)]
pub const FRIDAY_10AM_MILLIS: &str = "1704448800000";

#[allow(dead_code)]
pub const ANSWER_PAGE: &str = include_str!("../fixtures/answer.html");

fn home_dir() -> &'static Path {
    static HOME: OnceLock<TempDir> = OnceLock::new();
    HOME.get_or_init(|| tempfile::tempdir().expect("failed to create home dir for tests"))
        .path()
}

/// Create a `keepsake` command isolated from the user's configuration.
#[allow(dead_code)]
pub fn keepsake_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("keepsake"));
    cmd.timeout(CMD_TIMEOUT);
    let home = home_dir();
    cmd.env_remove("KEEPSAKE_CONFIG");
    cmd.env("HOME", home);
    cmd.env("XDG_CONFIG_HOME", home.join(".config"));
    cmd.env("NO_COLOR", "1");
    cmd
}

/// Write a listing file of `[url, label]` pairs into `dir`.
#[allow(dead_code)]
pub fn write_listing(dir: &Path, items: &[(&str, &str)]) -> std::path::PathBuf {
    let path = dir.join("answers.json");
    let json = serde_json::to_string(items).unwrap();
    std::fs::write(&path, json).unwrap();
    path
}
