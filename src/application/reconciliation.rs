use crate::domain::checkout::META_APPOINTMENT_ID;
use crate::domain::event::{EventKind, GatewayEvent};
use crate::domain::ports::{ContractStoreRef, SettlementLedgerRef};
use crate::domain::settlement::{Settlement, SettlementStatus};
use crate::error::Result;
use serde::Serialize;
use uuid::Uuid;

/// What applying one gateway event did to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// The settlement moved to `status`.
    Processed {
        settlement_id: Uuid,
        status: SettlementStatus,
    },
    /// The settlement was already in the state this event asks for.
    AlreadyApplied { settlement_id: Uuid },
    /// Checkout finished but the funds have not cleared yet.
    AwaitingPayment { settlement_id: Uuid },
    /// No settlement matches the event.
    Unmatched,
    /// The event type or transition is not one the ledger acts on.
    Ignored,
}

/// Applies at-least-once gateway confirmations to the settlement ledger.
pub struct Reconciler {
    ledger: SettlementLedgerRef,
    contracts: ContractStoreRef,
}

impl Reconciler {
    pub fn new(ledger: SettlementLedgerRef, contracts: ContractStoreRef) -> Self {
        Self { ledger, contracts }
    }

    pub async fn apply(&self, event: GatewayEvent) -> Result<ReconcileOutcome> {
        let target = match event.kind() {
            EventKind::CheckoutCompleted { paid: true } | EventKind::AsyncPaymentSucceeded => {
                SettlementStatus::Succeeded
            }
            EventKind::CheckoutCompleted { paid: false } => {
                return Ok(match self.locate(&event).await? {
                    Some(settlement) => ReconcileOutcome::AwaitingPayment {
                        settlement_id: settlement.id,
                    },
                    None => ReconcileOutcome::Unmatched,
                });
            }
            EventKind::AsyncPaymentFailed => SettlementStatus::Failed,
            EventKind::CheckoutExpired => SettlementStatus::Expired,
            EventKind::ChargeRefunded { full: true } => SettlementStatus::Refunded,
            EventKind::ChargeRefunded { full: false } => {
                tracing::info!(
                    event_id = %event.id,
                    object_id = %event.object().id,
                    "partial refund leaves the settlement unchanged"
                );
                return Ok(ReconcileOutcome::Ignored);
            }
            EventKind::Other => {
                tracing::debug!(event_id = %event.id, event_type = %event.event_type, "ignoring event");
                return Ok(ReconcileOutcome::Ignored);
            }
        };

        let Some(current) = self.locate(&event).await? else {
            tracing::warn!(
                event_id = %event.id,
                event_type = %event.event_type,
                object_id = %event.object().id,
                "no settlement matches gateway event"
            );
            return Ok(ReconcileOutcome::Unmatched);
        };

        if current.status == target {
            if target == SettlementStatus::Succeeded {
                // A failed count on an earlier delivery is retried here.
                self.count(&current).await?;
            }
            return Ok(ReconcileOutcome::AlreadyApplied {
                settlement_id: current.id,
            });
        }
        let Some(mut updated) = current.transitioned(target, &event.id) else {
            tracing::warn!(
                settlement_id = %current.id,
                from = ?current.status,
                to = ?target,
                event_id = %event.id,
                "event does not apply to settlement in its current state"
            );
            return Ok(ReconcileOutcome::Ignored);
        };
        if updated.payment_intent_id.is_none() {
            updated.payment_intent_id = event.object().payment_intent.clone();
        }

        if !self.ledger.compare_and_update(current.status, updated.clone()).await? {
            return Ok(ReconcileOutcome::AlreadyApplied {
                settlement_id: current.id,
            });
        }

        if target == SettlementStatus::Succeeded {
            self.count(&updated).await?;
        }

        tracing::info!(
            settlement_id = %updated.id,
            appointment_id = %updated.appointment_id,
            status = ?updated.status,
            transfer_status = ?updated.transfer_status,
            event_id = %event.id,
            "settlement reconciled"
        );
        Ok(ReconcileOutcome::Processed {
            settlement_id: updated.id,
            status: updated.status,
        })
    }

    async fn count(&self, settlement: &Settlement) -> Result<()> {
        let counted = self
            .contracts
            .record_settlement(
                settlement.payee_id,
                settlement.id,
                settlement.updated_at.date_naive(),
            )
            .await?;
        if counted {
            tracing::debug!(
                settlement_id = %settlement.id,
                payee_id = %settlement.payee_id,
                "settlement counted against contract"
            );
        }
        Ok(())
    }

    /// Session id first, then payment intent, then the appointment metadata.
    async fn locate(&self, event: &GatewayEvent) -> Result<Option<Settlement>> {
        let object = event.object();
        if let Some(found) = self.ledger.find_by_session(&object.id).await? {
            return Ok(Some(found));
        }
        if let Some(intent) = object.payment_intent.as_deref() {
            if let Some(found) = self.ledger.find_by_payment_intent(intent).await? {
                return Ok(Some(found));
            }
        }
        match object
            .metadata
            .get(META_APPOINTMENT_ID)
            .and_then(|raw| Uuid::parse_str(raw).ok())
        {
            Some(appointment_id) => self.ledger.find_live_by_appointment(appointment_id).await,
            None => Ok(None),
        }
    }
}
