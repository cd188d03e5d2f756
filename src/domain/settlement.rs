use crate::domain::commission::CommissionBreakdown;
use crate::domain::money::{Currency, Money};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    Pending,
    Succeeded,
    Failed,
    Expired,
    Refunded,
}

impl SettlementStatus {
    /// Live settlements block a new attempt for the same appointment.
    pub fn is_live(&self) -> bool {
        matches!(self, SettlementStatus::Pending | SettlementStatus::Succeeded)
    }

    pub fn can_transition_to(&self, next: SettlementStatus) -> bool {
        use SettlementStatus::*;
        matches!(
            (self, next),
            (Pending, Succeeded) | (Pending, Failed) | (Pending, Expired) | (Succeeded, Refunded)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    Transferred,
    NotApplicable,
    Reversed,
}

/// One ledger row per payment attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub payee_id: Uuid,
    pub payer_id: Uuid,
    pub checkout_session_id: String,
    pub payment_intent_id: Option<String>,
    pub total: Money,
    pub payee_net: Money,
    pub platform_commission: Money,
    pub gateway_fee: Money,
    pub currency: Currency,
    pub test_mode: bool,
    pub has_split: bool,
    pub status: SettlementStatus,
    pub transfer_status: TransferStatus,
    /// Last gateway event applied to this row.
    pub last_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Identifiers of the attempt a settlement is recorded for.
#[derive(Debug, Clone, Copy)]
pub struct SettlementParties {
    pub appointment_id: Uuid,
    pub payee_id: Uuid,
    pub payer_id: Uuid,
}

impl Settlement {
    pub fn pending(
        parties: SettlementParties,
        breakdown: &CommissionBreakdown,
        currency: Currency,
        checkout_session_id: String,
        payment_intent_id: Option<String>,
        test_mode: bool,
        has_split: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            appointment_id: parties.appointment_id,
            payee_id: parties.payee_id,
            payer_id: parties.payer_id,
            checkout_session_id,
            payment_intent_id,
            total: breakdown.total,
            payee_net: breakdown.payee_net,
            platform_commission: breakdown.platform_commission,
            gateway_fee: breakdown.gateway_fee,
            currency,
            test_mode,
            has_split,
            status: SettlementStatus::Pending,
            transfer_status: if has_split {
                TransferStatus::Pending
            } else {
                TransferStatus::NotApplicable
            },
            last_event_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_balanced(&self) -> bool {
        CommissionBreakdown {
            total: self.total,
            platform_commission: self.platform_commission,
            gateway_fee: self.gateway_fee,
            payee_net: self.payee_net,
        }
        .is_balanced()
    }

    /// Returns the row after moving to `next`, or `None` if the move is not allowed.
    pub fn transitioned(&self, next: SettlementStatus, event_id: &str) -> Option<Settlement> {
        if !self.status.can_transition_to(next) {
            return None;
        }
        let mut updated = self.clone();
        updated.status = next;
        updated.transfer_status = if self.has_split {
            match next {
                SettlementStatus::Pending => TransferStatus::Pending,
                SettlementStatus::Succeeded => TransferStatus::Transferred,
                SettlementStatus::Refunded => TransferStatus::Reversed,
                SettlementStatus::Failed | SettlementStatus::Expired => {
                    TransferStatus::NotApplicable
                }
            }
        } else {
            TransferStatus::NotApplicable
        };
        updated.last_event_id = Some(event_id.to_string());
        updated.updated_at = Utc::now();
        Some(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::commission::CommissionPolicy;
    use crate::domain::contract::ContractTier;
    use rust_decimal_macros::dec;

    fn settlement(has_split: bool) -> Settlement {
        let breakdown = CommissionPolicy::default().quote_tier(
            Some(ContractTier::FlatLow),
            3,
            Money::new(dec!(50)),
        );
        Settlement::pending(
            SettlementParties {
                appointment_id: Uuid::new_v4(),
                payee_id: Uuid::new_v4(),
                payer_id: Uuid::new_v4(),
            },
            &breakdown,
            Currency::default(),
            "cs_test_1".to_string(),
            None,
            true,
            has_split,
        )
    }

    #[test]
    fn test_pending_settlement_is_balanced() {
        let s = settlement(true);
        assert_eq!(s.status, SettlementStatus::Pending);
        assert_eq!(s.transfer_status, TransferStatus::Pending);
        assert!(s.is_balanced());
        assert_eq!(s.total, Money::new(dec!(50)));
        assert_eq!(s.payee_net, Money::new(dec!(45.05)));
    }

    #[test]
    fn test_without_split_transfer_not_applicable() {
        let s = settlement(false);
        assert_eq!(s.transfer_status, TransferStatus::NotApplicable);
        let done = s.transitioned(SettlementStatus::Succeeded, "evt_1").unwrap();
        assert_eq!(done.transfer_status, TransferStatus::NotApplicable);
    }

    #[test]
    fn test_success_then_refund() {
        let s = settlement(true);
        let done = s.transitioned(SettlementStatus::Succeeded, "evt_1").unwrap();
        assert_eq!(done.status, SettlementStatus::Succeeded);
        assert_eq!(done.transfer_status, TransferStatus::Transferred);
        assert_eq!(done.last_event_id.as_deref(), Some("evt_1"));

        let refunded = done.transitioned(SettlementStatus::Refunded, "evt_2").unwrap();
        assert_eq!(refunded.transfer_status, TransferStatus::Reversed);
    }

    #[test]
    fn test_terminal_states_reject_further_moves() {
        let s = settlement(true);
        let expired = s.transitioned(SettlementStatus::Expired, "evt_1").unwrap();
        assert_eq!(expired.transfer_status, TransferStatus::NotApplicable);
        assert!(expired.transitioned(SettlementStatus::Succeeded, "evt_2").is_none());
        assert!(s.transitioned(SettlementStatus::Refunded, "evt_3").is_none());

        let done = s.transitioned(SettlementStatus::Succeeded, "evt_4").unwrap();
        assert!(done.transitioned(SettlementStatus::Succeeded, "evt_4").is_none());
    }

    #[test]
    fn test_liveness() {
        assert!(SettlementStatus::Pending.is_live());
        assert!(SettlementStatus::Succeeded.is_live());
        assert!(!SettlementStatus::Expired.is_live());
        assert!(!SettlementStatus::Failed.is_live());
        assert!(!SettlementStatus::Refunded.is_live());
    }
}
