#![allow(clippy::unwrap_used)]

mod common;

use common::{ANSWER_PAGE, keepsake_cmd};
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn converts_raw_pages_into_standalone_documents() {
    let dir = TempDir::new().unwrap();
    let raw = dir.path().join("raw");
    let cooked = dir.path().join("cooked");
    std::fs::create_dir_all(&raw).unwrap();
    std::fs::write(raw.join("2024-01-05 Why-is-the-sky-blue.html"), ANSWER_PAGE).unwrap();

    keepsake_cmd()
        .arg("convert")
        .arg(&raw)
        .arg(&cooked)
        .arg("--no-download")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 converted"));

    let html = std::fs::read_to_string(cooked.join("2024-01-05 Why-is-the-sky-blue.html")).unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<title>Why is the sky blue? - Quora</title>"));
    assert!(html.contains("<b>Rayleigh scattering</b>"));
    assert!(html.contains(r#"<a href="https://www.quora.com/topic/Physics">physics</a>"#));
    assert!(html.contains("<li>Blue light scatters more</li>"));
    assert!(!html.contains("onclick"));
    assert!(!html.contains("style=\"color"));
    assert!(!html.contains("View Upvoters"));
    assert!(!html.contains("Notifications"));
    assert!(!html.contains("Careers"));
    assert!(!html.contains("tracking"));

    let sidecar = std::fs::read_to_string(cooked.join("2024-01-05 Why-is-the-sky-blue.json")).unwrap();
    let sidecar: serde_json::Value = serde_json::from_str(&sidecar).unwrap();
    assert_eq!(
        sidecar["url"],
        "https://www.quora.com/Why-is-the-sky-blue/answer/Jane-Doe"
    );
    assert_eq!(sidecar["date"], "2024-01-05");
    assert_eq!(sidecar["warnings"], 0);
}

#[test]
fn page_without_answer_is_skipped() {
    let dir = TempDir::new().unwrap();
    let raw = dir.path().join("raw");
    let cooked = dir.path().join("cooked");
    std::fs::create_dir_all(&raw).unwrap();
    std::fs::write(raw.join("2024-01-05 Good.html"), ANSWER_PAGE).unwrap();
    std::fs::write(raw.join("2024-01-06 Profile.html"), "<html><body>profile</body></html>").unwrap();

    keepsake_cmd()
        .arg("convert")
        .arg(&raw)
        .arg(&cooked)
        .arg("--no-download")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 failed"));

    assert!(cooked.join("2024-01-05 Good.html").is_file());
    assert!(!cooked.join("2024-01-06 Profile.html").exists());
}

#[test]
fn empty_input_directory_fails() {
    let dir = TempDir::new().unwrap();
    let raw = dir.path().join("raw");
    std::fs::create_dir_all(&raw).unwrap();

    keepsake_cmd()
        .arg("convert")
        .arg(&raw)
        .arg(dir.path().join("cooked"))
        .assert()
        .failure();
}
