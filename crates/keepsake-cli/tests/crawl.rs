#![allow(clippy::unwrap_used)]

mod common;

use common::{ANSWER_PAGE, FRIDAY_10AM_MILLIS, keepsake_cmd, write_listing};
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test(flavor = "multi_thread")]
async fn downloads_pages_named_by_date_and_slug() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Why-is-the-sky-blue/answer/Jane-Doe"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ANSWER_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Deleted-question/answer/Jane-Doe"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let good = format!("{}/Why-is-the-sky-blue/answer/Jane-Doe", server.uri());
    let gone = format!("{}/Deleted-question/answer/Jane-Doe", server.uri());
    let listing = write_listing(dir.path(), &[(&gone, "Added Mon"), (&good, "Added Fri")]);
    let raw = dir.path().join("raw");

    keepsake_cmd()
        .arg("crawl")
        .arg(&listing)
        .arg(&raw)
        .args(["-t", FRIDAY_10AM_MILLIS, "-z", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 downloaded"))
        .stdout(predicate::str::contains("1 failed"));

    let saved = std::fs::read_to_string(raw.join("2024-01-05 Why-is-the-sky-blue.html")).unwrap();
    assert_eq!(saved, ANSWER_PAGE);
    assert!(!raw.join("2024-01-01 Deleted-question.html").exists());

    // A second run leaves existing pages alone.
    keepsake_cmd()
        .arg("crawl")
        .arg(&listing)
        .arg(&raw)
        .args(["-t", FRIDAY_10AM_MILLIS, "-z", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 skipped"));
}

#[test]
fn malformed_listing_is_fatal() {
    let dir = TempDir::new().unwrap();
    let listing = dir.path().join("answers.json");
    std::fs::write(&listing, r#"{"url": "https://www.quora.com/Why/answer/Jane"}"#).unwrap();

    keepsake_cmd()
        .arg("crawl")
        .arg(&listing)
        .arg(dir.path().join("raw"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("ERROR"));
    assert!(!dir.path().join("raw").exists());
}

#[test]
fn missing_listing_is_fatal() {
    let dir = TempDir::new().unwrap();
    keepsake_cmd()
        .arg("crawl")
        .arg(dir.path().join("absent.json"))
        .assert()
        .failure();
}
