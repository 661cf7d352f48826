//! CLI integration tests
use predicates::prelude::*;
use tempfile::TempDir;

fn cmd() -> assert_cmd::Command {
    assert_cmd::cargo::cargo_bin_cmd!("folio")
}

fn get_fixture_path(name: &str) -> String {
    format!("../../tests/fixtures/{}", name)
}

/// Points image fetches at a closed local port so they fail fast.
const OFFLINE: [&str; 4] = ["-H", "127.0.0.1:9", "--scheme", "http"];

#[test]
fn test_cli_help() {
    cmd().arg("--help").assert().success().stdout(predicate::str::contains("EPUB"));
}

#[test]
fn test_cli_missing_input() {
    cmd().assert().failure().stderr(predicate::str::contains("INPUT"));
}

#[test]
fn test_cli_file_input() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("linux.epub");

    cmd()
        .args(OFFLINE)
        .args(["-o", output.to_str().unwrap()])
        .arg(get_fixture_path("article.html"))
        .assert()
        .success()
        .stderr(predicate::str::contains("EPUB written to"));

    let bytes = std::fs::read(&output).unwrap();
    assert!(bytes.starts_with(b"PK"));
    assert_eq!(&bytes[30..38], b"mimetype");
}

#[test]
fn test_cli_default_output_name() {
    let tmp = TempDir::new().unwrap();
    let fixture = std::fs::canonicalize(get_fixture_path("article.html")).unwrap();

    cmd().current_dir(tmp.path()).args(OFFLINE).arg(&fixture).assert().success();

    assert!(tmp.path().join("article.epub").exists());
}

#[test]
fn test_cli_verbose() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("verbose.epub");

    cmd()
        .args(OFFLINE)
        .args(["-v", "-o", output.to_str().unwrap()])
        .arg(get_fixture_path("article.html"))
        .assert()
        .success()
        .stderr(predicate::str::contains("Folio"))
        .stderr(predicate::str::contains("Sortie de Linux 6.8"))
        .stderr(predicate::str::contains("Timing Summary"));
}

#[test]
fn test_cli_invalid_file() {
    cmd().args(OFFLINE).arg("nonexistent.html").assert().failure();
}

#[test]
fn test_cli_page_without_article() {
    let tmp = TempDir::new().unwrap();
    let page = tmp.path().join("empty.html");
    std::fs::write(&page, "<html><body><p>Rien</p></body></html>").unwrap();

    cmd()
        .args(OFFLINE)
        .arg(&page)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No article found"));
}

#[test]
fn test_cli_unreachable_host() {
    let tmp = TempDir::new().unwrap();

    cmd()
        .current_dir(tmp.path())
        .args(["--timeout", "2"])
        .arg("http://127.0.0.1:9/news/sortie-de-linux")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to fetch"));

    assert!(!tmp.path().join("sortie-de-linux.epub").exists());
}
