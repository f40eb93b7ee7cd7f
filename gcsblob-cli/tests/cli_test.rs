use assert_cmd::Command;
use predicates::prelude::*;

fn gcsblob() -> Command {
    let mut cmd = Command::cargo_bin("gcsblob").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn prints_version() {
    gcsblob()
        .arg("-v")
        .assert()
        .code(0)
        .stdout(format!("version {}\n", env!("CARGO_PKG_VERSION")));
}

#[test]
fn prints_help_with_examples() {
    gcsblob()
        .arg("-help")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("gcsblob -b bucket sign <remote-blob>"));
}

#[test]
fn no_command_prints_help() {
    gcsblob()
        .assert()
        .code(0)
        .stdout(predicate::str::contains("EXAMPLES:"));
}

#[test]
fn unknown_flag_is_a_usage_error() {
    gcsblob()
        .args(["-nope", "exists", "id"])
        .assert()
        .code(2);
}

#[test]
fn missing_bucket_is_fatal() {
    gcsblob()
        .args(["exists", "id"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no bucket name provided"));
}

#[test]
fn unknown_storage_class_is_fatal() {
    gcsblob()
        .args(["-b", "blobs", "-storage-class", "FROZEN", "exists", "id"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("FROZEN"));
}

#[test]
fn wrong_argument_count_is_fatal() {
    gcsblob()
        .args(["-b", "blobs", "put", "only-source"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "put method expected 2 arguments got 2",
        ));
}

#[test]
fn invalid_sign_action_is_fatal() {
    gcsblob()
        .args(["-b", "blobs", "sign", "id", "post", "1h"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "invalid signing action: POST must be GET, PUT, or DELETE",
        ));
}
