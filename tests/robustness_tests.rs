use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

mod common;

#[test]
fn test_malformed_rows_do_not_stop_the_run() {
    let requests = common::requests_file(&[
        common::row(1, "100", common::FLAT_LOW_FRESH, common::PAYER),
        // Text in amount field
        common::row(2, "not_a_number", common::FLAT_LOW_FRESH, common::PAYER),
        // Non-uuid payee
        common::row(3, "40", "payee-7", common::PAYER),
        // Zero amount
        common::row(4, "0", common::FLAT_LOW_FRESH, common::PAYER),
        common::row(5, "60", common::FLAT_LOW_FRESH, common::PAYER),
    ]);

    let output = Command::new(cargo_bin!("booking-settlement"))
        .env_remove("STRIPE_SECRET_KEY")
        .arg("checkout")
        .arg(requests.path())
        .arg("--directory")
        .arg(common::DIRECTORY)
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(common::session_ids(&output.stdout).len(), 2);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 5);
    assert_eq!(stdout.matches(r#"{"error":"#).count(), 3);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error processing request: CSV error"));
    assert!(stderr.contains("practitionerId is not a valid id"));
}

#[test]
fn test_unknown_parties_are_rejected() {
    let requests = common::requests_file(&[
        common::row(1, "100", "00000000-0000-4000-8000-00000000dead", common::PAYER),
        common::row(2, "100", common::FLAT_LOW_FRESH, "00000000-0000-4000-8000-00000000beef"),
    ]);

    Command::new(cargo_bin!("booking-settlement"))
        .env_remove("STRIPE_SECRET_KEY")
        .arg("checkout")
        .arg(requests.path())
        .arg("--directory")
        .arg(common::DIRECTORY)
        .assert()
        .success()
        .stdout(predicate::str::contains("payee 00000000-0000-4000-8000-00000000dead not found"))
        .stdout(predicate::str::contains("payer 00000000-0000-4000-8000-00000000beef not found"));
}

#[test]
fn test_missing_input_file_fails() {
    Command::new(cargo_bin!("booking-settlement"))
        .arg("checkout")
        .arg("tests/fixtures/does_not_exist.csv")
        .assert()
        .failure();
}
