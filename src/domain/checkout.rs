use crate::domain::commission::CommissionBreakdown;
use crate::domain::money::Currency;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;
use uuid::Uuid;

pub const META_APPOINTMENT_ID: &str = "appointment_id";
pub const META_PRACTITIONER_ID: &str = "practitioner_id";
pub const META_CLIENT_ID: &str = "client_id";
pub const META_CUSTOMER_ID: &str = "customer_id";
pub const META_PLATFORM_COMMISSION: &str = "platform_commission";
pub const META_PRACTITIONER_NET: &str = "practitioner_net";

/// Everything needed to price and route one checkout.
#[derive(Debug, Clone)]
pub struct CheckoutDraft {
    pub payer_billing_ref: String,
    pub description: String,
    pub success_url: Url,
    pub cancel_url: Url,
    pub appointment_id: Uuid,
    pub payee_id: Uuid,
    pub payer_id: Uuid,
    pub breakdown: CommissionBreakdown,
    pub currency: Currency,
    pub payee_payout_account: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub currency: Currency,
    /// Price in the smallest currency unit.
    pub unit_amount: i64,
    pub quantity: u32,
}

/// Routes the payee's share to a connected account; the platform keeps the fee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitInstruction {
    pub application_fee_amount: i64,
    pub destination: String,
}

/// Hosted-checkout request handed to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSessionRequest {
    pub customer: String,
    pub line_item: LineItem,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: BTreeMap<String, String>,
    pub split: Option<SplitInstruction>,
    /// Unique per checkout attempt. A later attempt for the same appointment,
    /// after a failure or expiry, must get a fresh session rather than the
    /// gateway's cached one.
    pub idempotency_key: String,
}

impl CheckoutSessionRequest {
    pub fn build(draft: &CheckoutDraft) -> Result<Self> {
        let breakdown = &draft.breakdown;
        let unit_amount = breakdown.total.to_minor_units()?;

        let mut metadata = BTreeMap::new();
        metadata.insert(META_APPOINTMENT_ID.to_string(), draft.appointment_id.to_string());
        metadata.insert(META_PRACTITIONER_ID.to_string(), draft.payee_id.to_string());
        metadata.insert(META_CLIENT_ID.to_string(), draft.payer_id.to_string());
        metadata.insert(META_CUSTOMER_ID.to_string(), draft.payer_billing_ref.clone());
        metadata.insert(
            META_PLATFORM_COMMISSION.to_string(),
            breakdown.platform_commission.to_string(),
        );
        metadata.insert(
            META_PRACTITIONER_NET.to_string(),
            breakdown.payee_net.to_string(),
        );

        let split = match &draft.payee_payout_account {
            Some(destination) if breakdown.payee_net.is_positive() => Some(SplitInstruction {
                application_fee_amount: breakdown.platform_commission.to_minor_units()?,
                destination: destination.clone(),
            }),
            _ => None,
        };

        Ok(Self {
            customer: draft.payer_billing_ref.clone(),
            line_item: LineItem {
                name: draft.description.clone(),
                currency: draft.currency.clone(),
                unit_amount,
                quantity: 1,
            },
            success_url: draft.success_url.to_string(),
            cancel_url: draft.cancel_url.to_string(),
            metadata,
            split,
            idempotency_key: format!("checkout:{}:{}", draft.appointment_id, Uuid::new_v4()),
        })
    }

    pub fn appointment_id(&self) -> Option<&str> {
        self.metadata.get(META_APPOINTMENT_ID).map(String::as_str)
    }
}

/// Session returned by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
    pub payment_intent: Option<String>,
    pub livemode: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCustomerRequest {
    pub email: String,
    pub name: String,
    pub payer_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::commission::CommissionPolicy;
    use crate::domain::contract::ContractTier;
    use crate::domain::money::Money;
    use rust_decimal_macros::dec;

    fn draft(payout: Option<&str>, total: rust_decimal::Decimal, settled: u32) -> CheckoutDraft {
        CheckoutDraft {
            payer_billing_ref: "cus_test_1".to_string(),
            description: "Initial consultation".to_string(),
            success_url: Url::parse("https://app.example.com/paid").unwrap(),
            cancel_url: Url::parse("https://app.example.com/cancelled").unwrap(),
            appointment_id: Uuid::new_v4(),
            payee_id: Uuid::new_v4(),
            payer_id: Uuid::new_v4(),
            breakdown: CommissionPolicy::default().quote_tier(
                Some(ContractTier::FlatLow),
                settled,
                Money::new(total),
            ),
            currency: Currency::default(),
            payee_payout_account: payout.map(String::from),
        }
    }

    #[test]
    fn test_line_item_priced_in_minor_units() {
        let request = CheckoutSessionRequest::build(&draft(None, dec!(100), 0)).unwrap();
        assert_eq!(request.line_item.unit_amount, 10_000);
        assert_eq!(request.line_item.quantity, 1);
        assert_eq!(request.line_item.currency.as_str(), "eur");
        assert_eq!(request.customer, "cus_test_1");
    }

    #[test]
    fn test_idempotency_key_is_scoped_to_one_attempt() {
        let d = draft(Some("acct_1"), dec!(100), 0);
        let first = CheckoutSessionRequest::build(&d).unwrap();
        let second = CheckoutSessionRequest::build(&d).unwrap();
        let prefix = format!("checkout:{}:", d.appointment_id);
        assert!(first.idempotency_key.starts_with(&prefix));
        assert!(second.idempotency_key.starts_with(&prefix));
        assert_ne!(first.idempotency_key, second.idempotency_key);
    }

    #[test]
    fn test_metadata_carries_identifiers_and_split_amounts() {
        let d = draft(Some("acct_1"), dec!(50), 3);
        let request = CheckoutSessionRequest::build(&d).unwrap();
        assert_eq!(request.appointment_id(), Some(d.appointment_id.to_string().as_str()));
        assert_eq!(request.metadata[META_PRACTITIONER_ID], d.payee_id.to_string());
        assert_eq!(request.metadata[META_CLIENT_ID], d.payer_id.to_string());
        assert_eq!(request.metadata[META_PLATFORM_COMMISSION], "4.00");
        assert_eq!(request.metadata[META_PRACTITIONER_NET], "45.05");
    }

    #[test]
    fn test_split_attached_with_payout_account() {
        let request = CheckoutSessionRequest::build(&draft(Some("acct_1"), dec!(50), 3)).unwrap();
        assert_eq!(
            request.split,
            Some(SplitInstruction {
                application_fee_amount: 400,
                destination: "acct_1".to_string(),
            })
        );
    }

    #[test]
    fn test_no_split_without_payout_account() {
        let d = draft(None, dec!(50), 3);
        assert!(d.breakdown.payee_net.is_positive());
        let request = CheckoutSessionRequest::build(&d).unwrap();
        assert!(request.split.is_none());
    }

    #[test]
    fn test_no_split_when_payee_net_not_positive() {
        let mut d = draft(Some("acct_1"), dec!(100), 0);
        d.breakdown.payee_net = Money::ZERO;
        assert!(CheckoutSessionRequest::build(&d).unwrap().split.is_none());
    }
}
