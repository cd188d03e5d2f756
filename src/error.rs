use miette::Diagnostic;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, SettlementError>;

/// Failures reported by a payment gateway adapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },
    #[error("{operation} rejected by gateway (status {status}): {message}")]
    Rejected {
        operation: String,
        status: u16,
        message: String,
    },
    #[error("{operation} transport error: {message}")]
    Transport { operation: String, message: String },
    #[error("{operation} returned an unreadable response: {message}")]
    InvalidResponse { operation: String, message: String },
}

#[derive(Error, Diagnostic, Debug)]
pub enum SettlementError {
    #[error("invalid input: {0}")]
    #[diagnostic(code(settlement::invalid_input))]
    InvalidInput(String),

    #[error("payer {0} not found in profiles or identity directory")]
    #[diagnostic(code(settlement::payer_not_found))]
    PayerNotFound(Uuid),

    #[error("payee {0} not found")]
    #[diagnostic(code(settlement::payee_not_found))]
    PayeeNotFound(Uuid),

    #[error("appointment {0} already has a live settlement")]
    #[diagnostic(code(settlement::duplicate_attempt))]
    DuplicateAttempt(Uuid),

    #[error("payee net {payee_net} is negative for total {total}")]
    #[diagnostic(
        code(settlement::negative_payee_net),
        help("the gateway surcharge exceeds the price; review the commission policy")
    )]
    NegativePayeeNet { total: Decimal, payee_net: Decimal },

    #[error("checkout creation failed: {0}")]
    #[diagnostic(code(settlement::checkout_creation_failed))]
    CheckoutCreationFailed(#[source] GatewayError),

    #[error("ledger write failed after session {session_id} was created: {reason}")]
    #[diagnostic(
        code(settlement::ledger_write_failed),
        help("the remote session exists without a local settlement; reconcile manually")
    )]
    LedgerWriteFailed { session_id: String, reason: String },

    #[error("a live settlement already exists for appointment {0}")]
    #[diagnostic(code(settlement::duplicate_settlement))]
    DuplicateSettlement(Uuid),

    #[error("no settlement matches {0}")]
    #[diagnostic(code(settlement::settlement_not_found))]
    SettlementNotFound(String),

    #[error("invalid webhook signature")]
    #[diagnostic(code(settlement::invalid_webhook_signature))]
    InvalidWebhookSignature,

    #[error("invalid webhook payload: {0}")]
    #[diagnostic(code(settlement::invalid_webhook_payload))]
    InvalidWebhookPayload(String),

    #[error("storage error: {0}")]
    #[diagnostic(code(settlement::storage))]
    Storage(String),

    #[error("configuration error: {0}")]
    #[diagnostic(code(settlement::config))]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),
}

impl SettlementError {
    /// True when the remote and local systems are left out of sync.
    pub fn is_reconciliation_hazard(&self) -> bool {
        matches!(self, SettlementError::LedgerWriteFailed { .. })
    }
}
