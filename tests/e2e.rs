use assert_cmd::Command;
use httpmock::prelude::*;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn breachwatch(reports: &Path) -> Command {
    let mut cmd = Command::cargo_bin("breachwatch").unwrap();
    cmd.arg("--color")
        .arg("never")
        .arg("--reports-dir")
        .arg(reports)
        .env_remove("HIBP_API_KEY")
        .env_remove("DEHASHED_API_KEY")
        .env_remove("XON_API_KEY");
    cmd
}

#[test]
fn exits_on_zero_and_prints_banner() {
    let tmp = tempdir().unwrap();
    breachwatch(tmp.path())
        .write_stdin("0\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("authorized security research"))
        .stdout(predicate::str::contains("Goodbye."));
}

#[test]
fn quiet_suppresses_banner_and_eof_exits() {
    let tmp = tempdir().unwrap();
    breachwatch(tmp.path())
        .arg("-q")
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("authorized security research").not())
        .stdout(predicate::str::contains("Goodbye."));
}

#[test]
fn invalid_option_and_invalid_email_return_to_menu() {
    let tmp = tempdir().unwrap();
    let reports = tmp.path().join("reports");
    breachwatch(&reports)
        .arg("-q")
        .write_stdin("7\n1\nnobody-at-example\n0\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Invalid option: \"7\""))
        .stdout(predicate::str::contains(
            "invalid email format: nobody-at-example",
        ));
    assert!(!reports.exists());
}

#[test]
fn password_check_writes_report_without_plaintext() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path_includes("/xon-pass/v1/pass/anon/");
        then.status(200)
            .json_body(json!({"SearchPassAnon": {"count": "42", "char": "D:2;A:6;S:0;L:8"}}));
    });
    let tmp = tempdir().unwrap();
    let reports = tmp.path().join("reports");
    breachwatch(&reports)
        .arg("-q")
        .arg("--endpoint-base")
        .arg(server.base_url())
        .write_stdin("3\nletmein99\n0\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Password Exposure Report"))
        .stdout(predicate::str::contains("Report saved to"));

    let files: Vec<_> = fs::read_dir(&reports).unwrap().collect();
    assert_eq!(files.len(), 1);
    let path = files[0].as_ref().unwrap().path();
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("password_"));
    assert!(name.ends_with(".txt"));
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("Password Exposure Report\n"));
    assert!(!text.contains("letmein99"));
    assert!(!text.contains('\u{1b}'));
}

#[test]
fn osint_profile_without_keys_still_produces_report() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/hudson/search-by-email");
        then.status(429);
    });
    server.mock(|when, then| {
        when.method(GET).path("/rdap/domain/example.test");
        then.status(404);
    });
    let tmp = tempdir().unwrap();
    let reports = tmp.path().join("reports");
    breachwatch(&reports)
        .arg("-q")
        .arg("--timeout")
        .arg("2")
        .arg("--endpoint-base")
        .arg(server.base_url())
        .write_stdin("6\nuser@example.test\n0\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Comprehensive OSINT Report"));

    let files: Vec<_> = fs::read_dir(&reports).unwrap().collect();
    assert_eq!(files.len(), 1);
    let text = fs::read_to_string(files[0].as_ref().unwrap().path()).unwrap();
    assert!(text.contains("Target: user@example.test"));
    assert!(text.contains("Failure class: rate limited"));
    assert!(text.contains("HIBP API key required"));
    assert!(text.contains("Dehashed API key required"));
    assert!(text.contains("SECURITY RECOMMENDATIONS"));
}

#[test]
fn help_lists_public_flags_only() {
    Command::cargo_bin("breachwatch")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--reports-dir"))
        .stdout(predicate::str::contains("--hibp-key"))
        .stdout(predicate::str::contains("--endpoint-base").not());
}

#[test]
fn zero_timeout_is_rejected() {
    let tmp = tempdir().unwrap();
    breachwatch(tmp.path())
        .arg("--timeout")
        .arg("0")
        .write_stdin("0\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--timeout"));
}
