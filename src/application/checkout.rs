use super::bounded;
use crate::domain::checkout::{CheckoutDraft, CheckoutSession, CheckoutSessionRequest};
use crate::domain::ports::PaymentGatewayRef;
use crate::error::{Result, SettlementError};
use std::time::Duration;

/// Turns a priced appointment into a hosted-checkout session.
pub struct CheckoutSessionBuilder {
    gateway: PaymentGatewayRef,
    timeout: Duration,
}

/// The session plus the request that produced it.
#[derive(Debug, Clone)]
pub struct BuiltSession {
    pub session: CheckoutSession,
    pub request: CheckoutSessionRequest,
}

impl BuiltSession {
    pub fn has_split(&self) -> bool {
        self.request.split.is_some()
    }
}

impl CheckoutSessionBuilder {
    pub fn new(gateway: PaymentGatewayRef, timeout: Duration) -> Self {
        Self { gateway, timeout }
    }

    pub async fn create(&self, draft: &CheckoutDraft) -> Result<BuiltSession> {
        let request = CheckoutSessionRequest::build(draft)?;
        if request.split.is_none() && draft.payee_payout_account.is_none() {
            tracing::debug!(
                payee_id = %draft.payee_id,
                "payee has no payout account; gross amount stays with the platform"
            );
        }

        let session = bounded(
            self.timeout,
            "create_checkout_session",
            self.gateway.create_checkout_session(request.clone()),
        )
        .await
        .map_err(SettlementError::CheckoutCreationFailed)?;

        tracing::info!(
            session_id = %session.id,
            appointment_id = %draft.appointment_id,
            split = request.split.is_some(),
            livemode = session.livemode,
            "checkout session created"
        );
        Ok(BuiltSession { session, request })
    }
}
