#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

mod common;

fn run(db_path: &Path, args: &[&str]) -> Output {
    let output = Command::new(cargo_bin!("booking-settlement"))
        .env_remove("STRIPE_SECRET_KEY")
        .env_remove("STRIPE_WEBHOOK_SECRET")
        .args(args)
        .arg("--db-path")
        .arg(db_path)
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    output
}

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: open a session for appointment 1.
    let first = common::requests_file(&[common::row(1, "100", common::FLAT_LOW_FRESH, common::PAYER)]);
    let output1 = run(
        &db_path,
        &["checkout", first.path().to_str().unwrap(), "--directory", common::DIRECTORY],
    );
    let sessions = common::session_ids(&output1.stdout);
    assert_eq!(sessions.len(), 1);

    // 2. A second process must see the pending settlement and refuse a new attempt.
    let output2 = run(
        &db_path,
        &["checkout", first.path().to_str().unwrap(), "--directory", common::DIRECTORY],
    );
    assert!(String::from_utf8_lossy(&output2.stdout).contains("already has a live settlement"));

    // 3. Confirm payment, twice, as the gateway may redeliver.
    let completed = format!(
        r#"{{"id":"evt_1","type":"checkout.session.completed","data":{{"object":{{"id":"{}","payment_intent":"pi_1","payment_status":"paid"}}}}}}"#,
        sessions[0]
    );
    let events = common::lines_file(&[completed.clone(), completed]);
    let output3 = run(&db_path, &["reconcile", events.path().to_str().unwrap()]);
    let stdout3 = String::from_utf8_lossy(&output3.stdout);
    assert!(stdout3.contains(r#""outcome":"processed""#));
    assert!(stdout3.contains(r#""outcome":"already_applied""#));

    // 4. The ledger survives and reflects the confirmation.
    let output4 = run(&db_path, &["ledger"]);
    let stdout4 = String::from_utf8_lossy(&output4.stdout);
    assert!(stdout4.contains(",100,0,1.65,98.35,eur,succeeded,transferred,true,"));
    assert!(stdout4.contains(&sessions[0]));
}
