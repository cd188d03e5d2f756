use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

mod common;

#[cfg(not(feature = "storage-rocksdb"))]
#[test]
fn test_rocksdb_fallback_warning() {
    let requests = common::requests_file(&[common::row(1, "100", common::FLAT_LOW_FRESH, common::PAYER)]);

    let mut cmd = Command::new(cargo_bin!("booking-settlement"));
    cmd.env_remove("STRIPE_SECRET_KEY")
        .arg("checkout")
        .arg(requests.path())
        .arg("--directory")
        .arg(common::DIRECTORY)
        .arg("--db-path")
        .arg("some_db");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(r#""sessionId":"cs_test_"#))
        .stderr(predicate::str::contains("WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."));
}

#[cfg(feature = "storage-rocksdb")]
#[test]
fn test_rocksdb_no_fallback_warning() {
    let requests = common::requests_file(&[common::row(1, "100", common::FLAT_LOW_FRESH, common::PAYER)]);
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    let mut cmd = Command::new(cargo_bin!("booking-settlement"));
    cmd.env_remove("STRIPE_SECRET_KEY")
        .arg("checkout")
        .arg(requests.path())
        .arg("--directory")
        .arg(common::DIRECTORY)
        .arg("--db-path")
        .arg(&db_path);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("WARNING").not());
}

#[test]
fn test_sandbox_gateway_without_api_key() {
    let requests = common::requests_file(&[common::row(1, "100", common::FLAT_LOW_FRESH, common::PAYER)]);

    Command::new(cargo_bin!("booking-settlement"))
        .env_remove("STRIPE_SECRET_KEY")
        .env("RUST_LOG", "info")
        .arg("checkout")
        .arg(requests.path())
        .arg("--directory")
        .arg(common::DIRECTORY)
        .assert()
        .success()
        .stdout(predicate::str::contains("https://checkout.sandbox.invalid/pay/cs_test_"))
        .stderr(predicate::str::contains("using the sandbox gateway"));
}
