//! Response bodies for the checkout endpoint.

use crate::application::orchestrator::{CheckoutRequest, CheckoutResponse, SettlementOrchestrator};
use crate::error::{Result, SettlementError};
use serde::Serialize;

pub const STATUS_OK: u16 = 200;
pub const STATUS_BAD_REQUEST: u16 = 400;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Session(CheckoutResponse),
    Error(ErrorBody),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl HttpResponse {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.body)?)
    }
}

/// Handles a raw JSON request body end to end.
pub async fn handle_checkout(orchestrator: &SettlementOrchestrator, body: &[u8]) -> HttpResponse {
    let result = match serde_json::from_slice::<CheckoutRequest>(body) {
        Ok(request) => orchestrator.handle(request).await,
        Err(e) => Err(SettlementError::InvalidInput(format!("malformed request body: {e}"))),
    };
    respond(result)
}

pub fn respond(result: Result<CheckoutResponse>) -> HttpResponse {
    match result {
        Ok(response) => HttpResponse {
            status: STATUS_OK,
            body: ResponseBody::Session(response),
        },
        Err(error) => HttpResponse {
            status: STATUS_BAD_REQUEST,
            body: ResponseBody::Error(ErrorBody {
                error: public_message(&error),
            }),
        },
    }
}

/// Message safe to show the payer. Storage and ledger internals stay in the logs.
pub fn public_message(error: &SettlementError) -> String {
    match error {
        SettlementError::LedgerWriteFailed { .. } => {
            "payment session could not be recorded; please contact support".to_string()
        }
        SettlementError::CheckoutCreationFailed(_) => {
            "payment provider is unavailable; please try again".to_string()
        }
        SettlementError::Csv(_) => "malformed request row".to_string(),
        SettlementError::Storage(_)
        | SettlementError::Config(_)
        | SettlementError::Io(_)
        | SettlementError::Json(_) => "internal error".to_string(),
        #[cfg(feature = "storage-rocksdb")]
        SettlementError::RocksDb(_) => "internal error".to_string(),
        other => other.to_string(),
    }
}
