//! Scenario: invalid requests fail before any network call.
//!
//! Validates:
//! - malformed symbols are rejected while opening the adapter
//! - unknown intervals name the accepted set
//! - malformed dates and inverted windows are rejected
//!
//! The base URL points at a closed local port, so any request that slipped
//! through would surface as a transport error instead of the asserted message.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

fn vnq() -> Command {
    let mut cmd = Command::cargo_bin("vnq").expect("vnq binary");
    cmd.env("VNQ_BASE_URL", "http://127.0.0.1:9/api/")
        .env("VNQ_MAX_RETRIES", "0")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn malformed_symbol_is_rejected() {
    vnq()
        .args(["history", "--symbol", "A!B", "--start", "2024-01-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot open quotes for 'A!B'"))
        .stderr(predicate::str::contains("invalid symbol"));
}

#[test]
fn unknown_interval_lists_choices() {
    vnq()
        .args([
            "history", "--symbol", "ACB", "--start", "2024-01-01", "--interval", "2h",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid interval '2h'"))
        .stderr(predicate::str::contains("1D"))
        .stderr(predicate::str::contains("transport").not());
}

#[test]
fn malformed_date_and_inverted_window_are_rejected() {
    vnq()
        .args(["history", "--symbol", "ACB", "--start", "01/02/2024"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("01/02/2024"));

    vnq()
        .args([
            "history", "--symbol", "ACB", "--start", "2024-02-01", "--end", "2024-01-01",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("history failed for ACB"));
}

#[test]
fn unknown_format_is_a_usage_error() {
    vnq()
        .args(["--format", "xml", "price-depth", "--symbol", "ACB"])
        .assert()
        .failure()
        .code(2);
}
