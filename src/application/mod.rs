//! Application layer: the steps of a payment attempt and the
//! reconciliation of gateway confirmations.
//!
//! [`orchestrator::SettlementOrchestrator`] is the entry point for new
//! attempts; [`reconciliation::Reconciler`] applies confirmation events to
//! the ledger.

pub mod checkout;
pub mod identity;
pub mod ledger;
pub mod orchestrator;
pub mod reconciliation;

use crate::error::GatewayError;
use std::future::Future;
use std::time::Duration;

/// Runs a gateway call with an upper bound on how long it may take.
pub(crate) async fn bounded<T, F>(
    timeout: Duration,
    operation: &str,
    call: F,
) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, timeout_ms = timeout.as_millis() as u64, "gateway call timed out");
            Err(GatewayError::Timeout {
                operation: operation.to_string(),
                seconds: timeout.as_secs(),
            })
        }
    }
}
