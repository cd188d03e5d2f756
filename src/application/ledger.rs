use super::checkout::BuiltSession;
use crate::domain::commission::CommissionBreakdown;
use crate::domain::money::Currency;
use crate::domain::ports::SettlementLedgerRef;
use crate::domain::settlement::{Settlement, SettlementParties};
use crate::error::{Result, SettlementError};

/// Persists the settlement row for an attempt whose session already exists.
pub struct LedgerWriter {
    ledger: SettlementLedgerRef,
}

impl LedgerWriter {
    pub fn new(ledger: SettlementLedgerRef) -> Self {
        Self { ledger }
    }

    pub async fn record(
        &self,
        parties: SettlementParties,
        breakdown: &CommissionBreakdown,
        currency: Currency,
        built: &BuiltSession,
    ) -> Result<Settlement> {
        let settlement = Settlement::pending(
            parties,
            breakdown,
            currency,
            built.session.id.clone(),
            built.session.payment_intent.clone(),
            !built.session.livemode,
            built.has_split(),
        );

        if let Err(err) = self.ledger.insert(settlement.clone()).await {
            tracing::error!(
                reconciliation_hazard = true,
                session_id = %built.session.id,
                appointment_id = %parties.appointment_id,
                error = %err,
                "checkout session exists without a ledger record"
            );
            return Err(SettlementError::LedgerWriteFailed {
                session_id: built.session.id.clone(),
                reason: err.to_string(),
            });
        }

        tracing::info!(
            settlement_id = %settlement.id,
            appointment_id = %settlement.appointment_id,
            total = %settlement.total,
            platform_commission = %settlement.platform_commission,
            gateway_fee = %settlement.gateway_fee,
            payee_net = %settlement.payee_net,
            test_mode = settlement.test_mode,
            "settlement recorded"
        );
        Ok(settlement)
    }
}
