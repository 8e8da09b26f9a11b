//! Binary-level argument and configuration tests.
//!
//! None of these reach the network: every case fails or exits during
//! argument parsing or configuration validation.

use assert_cmd::Command;
use predicates::prelude::*;

fn sqs_peek() -> Command {
    let mut cmd = Command::cargo_bin("sqs-peek").unwrap();
    for var in [
        "SQS_PEEK_CONFIG",
        "SQS_PEEK__QUEUE",
        "SQS_PEEK__REGION",
        "SQS_PEEK__FILE_NAME",
        "SQS_PEEK__WAIT_TIME_SECONDS",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_help_lists_flags() {
    sqs_peek()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--queue"))
        .stdout(predicate::str::contains("--region"))
        .stdout(predicate::str::contains("--file-name"))
        .stdout(predicate::str::contains("fileName"))
        .stdout(predicate::str::contains("--profile"))
        .stdout(predicate::str::contains("--purge"));
}

#[test]
fn test_missing_queue_exits_with_status_one() {
    sqs_peek()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("configuration failed"))
        .stderr(predicate::str::contains("queue"));
}

#[test]
fn test_malformed_queue_is_rejected() {
    sqs_peek()
        .args(["-q", "arn:aws:s3:::bucket"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("configuration failed"));
}

#[test]
fn test_wait_time_above_limit_is_rejected() {
    sqs_peek()
        .args(["-q", "orders", "--wait-time-seconds", "30"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("wait_time_seconds"));
}

#[test]
fn test_missing_config_file_is_rejected() {
    sqs_peek()
        .args(["-q", "orders", "--config", "/definitely/not/here.toml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_queue_from_environment_is_accepted() {
    sqs_peek()
        .env("SQS_PEEK__QUEUE", "orders")
        .args(["--wait-time-seconds", "21"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("wait_time_seconds"));
}

#[test]
fn test_unknown_flag_is_a_usage_error() {
    sqs_peek()
        .args(["-q", "orders", "--workers", "8"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--workers"));
}
