use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Confirmation event delivered by the gateway, at least once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub livemode: bool,
    pub data: GatewayEventData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayEventData {
    pub object: EventObject,
}

/// The subset of a checkout session or charge object the ledger needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventObject {
    pub id: String,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Charge amount in minor units. Only charge objects carry it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_refunded: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    CheckoutCompleted { paid: bool },
    AsyncPaymentSucceeded,
    AsyncPaymentFailed,
    CheckoutExpired,
    /// `full` is false when only part of the charge went back to the payer.
    ChargeRefunded { full: bool },
    Other,
}

impl GatewayEvent {
    pub fn kind(&self) -> EventKind {
        match self.event_type.as_str() {
            "checkout.session.completed" => EventKind::CheckoutCompleted {
                paid: matches!(
                    self.data.object.payment_status.as_deref(),
                    Some("paid") | Some("no_payment_required")
                ),
            },
            "checkout.session.async_payment_succeeded" => EventKind::AsyncPaymentSucceeded,
            "checkout.session.async_payment_failed" => EventKind::AsyncPaymentFailed,
            "checkout.session.expired" => EventKind::CheckoutExpired,
            "charge.refunded" => EventKind::ChargeRefunded {
                full: match (self.data.object.amount, self.data.object.amount_refunded) {
                    (Some(amount), Some(refunded)) => refunded >= amount,
                    _ => true,
                },
            },
            _ => EventKind::Other,
        }
    }

    pub fn object(&self) -> &EventObject {
        &self.data.object
    }
}
