use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use booking_settlement::interfaces::webhook::WebhookVerifier;
use predicates::prelude::*;
use secrecy::SecretString;
use std::process::Command;

mod common;

fn cli() -> Command {
    let mut cmd = Command::new(cargo_bin!("booking-settlement"));
    cmd.env_remove("STRIPE_SECRET_KEY")
        .env_remove("STRIPE_WEBHOOK_SECRET")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let ledger = tempfile::NamedTempFile::new()?;

    cli()
        .arg("checkout")
        .arg(common::REQUESTS)
        .arg("--directory")
        .arg(common::DIRECTORY)
        .arg("--ledger-csv")
        .arg(ledger.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"{"sessionId":"cs_test_"#).count(2))
        .stdout(predicate::str::contains("already has a live settlement"))
        .stdout(predicate::str::contains("missing required fields: practitionerId"))
        .stderr(predicate::str::contains("Error processing request"));

    let csv = std::fs::read_to_string(ledger.path())?;
    assert_eq!(csv.lines().count(), 3);
    // 100 on the free allotment, then 50 as the fourth settlement of the period.
    assert!(csv.contains(",100,0,1.65,98.35,eur,pending,pending,true,"));
    assert!(csv.contains(",50,4.00,0.95,45.05,eur,pending,pending,true,"));
    Ok(())
}

#[test]
fn test_payee_without_payout_account_still_settles() {
    let requests = common::requests_file(&[common::row(7, "80", common::NO_CONTRACT, common::PAYER)]);
    let ledger = tempfile::NamedTempFile::new().unwrap();

    cli()
        .arg("checkout")
        .arg(requests.path())
        .arg("--directory")
        .arg(common::DIRECTORY)
        .arg("--ledger-csv")
        .arg(ledger.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""sessionId":"cs_test_"#));

    let csv = std::fs::read_to_string(ledger.path()).unwrap();
    assert!(csv.contains(",80,0,1.37,78.63,eur,pending,not_applicable,true,"));
}

#[test]
fn test_ledger_is_empty_without_storage() {
    cli()
        .arg("ledger")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_reconcile_reports_each_event() {
    let events = common::lines_file(&[
        r#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{"id":"cs_test_unknown","payment_status":"paid"}}}"#.to_string(),
        r#"{"id":"evt_2","type":"customer.created","data":{"object":{"id":"cus_1"}}}"#.to_string(),
        "not json".to_string(),
    ]);

    cli()
        .arg("reconcile")
        .arg(events.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"{"outcome":"unmatched"}"#))
        .stdout(predicate::str::contains(r#"{"outcome":"ignored"}"#))
        .stderr(predicate::str::contains("invalid webhook payload"));
}

#[test]
fn test_reconcile_verifies_signatures_when_secret_is_set() {
    let secret = "whsec_cli_test";
    let verifier = WebhookVerifier::new(SecretString::from(secret.to_string()), 300);
    let payload = r#"{"id":"evt_1","type":"customer.created","data":{"object":{"id":"cus_1"}}}"#;
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;
    let signed = serde_json::json!({
        "signature": verifier.sign(payload.as_bytes(), now).unwrap(),
        "payload": payload,
    });
    let forged = serde_json::json!({
        "signature": format!("t={now},v1=00ff"),
        "payload": payload,
    });
    let events = common::lines_file(&[signed.to_string(), forged.to_string()]);

    cli()
        .env("STRIPE_WEBHOOK_SECRET", secret)
        .arg("reconcile")
        .arg(events.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"{"outcome":"ignored"}"#).count(1))
        .stderr(predicate::str::contains("invalid webhook signature"));
}

#[test]
fn test_invalid_config_is_reported() {
    let mut config = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut config, br#"{"gateway":{"timeout_secs":0}}"#).unwrap();

    cli()
        .arg("--config")
        .arg(config.path())
        .arg("ledger")
        .assert()
        .failure()
        .stderr(predicate::str::contains("timeout_secs"));
}
