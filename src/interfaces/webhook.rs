//! Verification of signed gateway webhooks.
//!
//! The signature header has the form `t=<unix seconds>,v1=<hex hmac>[,v1=...]`
//! where each `v1` is HMAC-SHA256 over `"<t>.<raw body>"` keyed with the
//! endpoint's signing secret.

use crate::domain::event::GatewayEvent;
use crate::error::{Result, SettlementError};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// A webhook body together with its signature header, as captured off the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPayload {
    pub signature: String,
    pub payload: String,
}

pub struct WebhookVerifier {
    secret: SecretString,
    tolerance_secs: i64,
}

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

impl WebhookVerifier {
    pub fn new(secret: SecretString, tolerance_secs: i64) -> Self {
        Self {
            secret,
            tolerance_secs,
        }
    }

    /// Checks the signature and freshness of `payload`, then parses it.
    pub fn verify(&self, payload: &[u8], header: &str) -> Result<GatewayEvent> {
        self.verify_at(payload, header, chrono::Utc::now().timestamp())
    }

    pub fn verify_at(&self, payload: &[u8], header: &str, now: i64) -> Result<GatewayEvent> {
        let header = parse_header(header)?;
        if now.abs_diff(header.timestamp) > self.tolerance_secs.unsigned_abs() {
            tracing::warn!(
                target: "booking_settlement::webhook",
                timestamp = header.timestamp,
                "webhook timestamp outside tolerance"
            );
            return Err(SettlementError::InvalidWebhookSignature);
        }

        let expected = self.mac(header.timestamp, payload)?;
        let matched = header
            .signatures
            .iter()
            .any(|candidate| bool::from(expected.as_slice().ct_eq(candidate.as_slice())));
        if !matched {
            return Err(SettlementError::InvalidWebhookSignature);
        }

        serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(target: "booking_settlement::webhook", error = %e, "malformed webhook payload");
            SettlementError::InvalidWebhookPayload("malformed JSON payload".to_string())
        })
    }

    /// Produces a header for `payload`, for replaying captured events and tests.
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> Result<String> {
        let mac = self.mac(timestamp, payload)?;
        Ok(format!("t={timestamp},v1={}", hex::encode(mac)))
    }

    fn mac(&self, timestamp: i64, payload: &[u8]) -> Result<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| SettlementError::Config("webhook secret rejected by HMAC".to_string()))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

fn parse_header(header: &str) -> Result<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let (key, value) = part
            .split_once('=')
            .ok_or(SettlementError::InvalidWebhookSignature)?;
        match key.trim() {
            "t" => timestamp = value.trim().parse().ok(),
            "v1" => {
                // An undecodable candidate simply never matches.
                if let Ok(bytes) = hex::decode(value.trim()) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    Ok(SignatureHeader {
        timestamp: timestamp.ok_or(SettlementError::InvalidWebhookSignature)?,
        signatures,
    })
}
