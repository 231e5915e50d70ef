use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_subcommands() {
    Command::cargo_bin("invox")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("process"))
        .stdout(predicate::str::contains("batch"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn process_rejects_missing_input() {
    Command::cargo_bin("invox")
        .unwrap()
        .args(["process", "/nonexistent/invoice.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn batch_rejects_empty_glob() {
    let dir = tempfile::tempdir().unwrap();
    let pattern = format!("{}/*.png", dir.path().display());
    Command::cargo_bin("invox")
        .unwrap()
        .args(["batch", &pattern])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching files"));
}
