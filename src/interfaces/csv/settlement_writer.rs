use crate::domain::settlement::{Settlement, SettlementStatus, TransferStatus};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use uuid::Uuid;

#[derive(Serialize)]
struct SettlementRow<'a> {
    id: Uuid,
    appointment_id: Uuid,
    payee_id: Uuid,
    payer_id: Uuid,
    checkout_session_id: &'a str,
    payment_intent_id: Option<&'a str>,
    total: String,
    platform_commission: String,
    gateway_fee: String,
    payee_net: String,
    currency: &'a str,
    status: SettlementStatus,
    transfer_status: TransferStatus,
    test_mode: bool,
    created_at: DateTime<Utc>,
}

impl<'a> From<&'a Settlement> for SettlementRow<'a> {
    fn from(s: &'a Settlement) -> Self {
        Self {
            id: s.id,
            appointment_id: s.appointment_id,
            payee_id: s.payee_id,
            payer_id: s.payer_id,
            checkout_session_id: &s.checkout_session_id,
            payment_intent_id: s.payment_intent_id.as_deref(),
            total: s.total.to_string(),
            platform_commission: s.platform_commission.to_string(),
            gateway_fee: s.gateway_fee.to_string(),
            payee_net: s.payee_net.to_string(),
            currency: s.currency.as_str(),
            status: s.status,
            transfer_status: s.transfer_status,
            test_mode: s.test_mode,
            created_at: s.created_at,
        }
    }
}

/// Writes the settlement ledger as CSV, one row per settlement.
pub struct SettlementWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> SettlementWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_settlements<'a, I>(&mut self, settlements: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Settlement>,
    {
        for settlement in settlements {
            self.writer.serialize(SettlementRow::from(settlement))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::commission::CommissionPolicy;
    use crate::domain::contract::ContractTier;
    use crate::domain::money::{Currency, Money};
    use crate::domain::settlement::SettlementParties;
    use rust_decimal_macros::dec;

    #[test]
    fn test_writes_header_and_amounts() {
        let breakdown = CommissionPolicy::default().quote_tier(
            Some(ContractTier::FlatLow),
            3,
            Money::new(dec!(50)),
        );
        let settlement = Settlement::pending(
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
            true,
        );

        let mut out = Vec::new();
        SettlementWriter::new(&mut out)
            .write_settlements([&settlement])
            .unwrap();
        let text = String::from_utf8(out).unwrap();

        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with(
            "id,appointment_id,payee_id,payer_id,checkout_session_id,payment_intent_id,total,platform_commission,gateway_fee,payee_net"
        ));
        let row = lines.next().unwrap();
        assert!(row.contains(",cs_test_1,,"));
        assert!(row.contains(",0.95,45.05,eur,pending,pending,true,"));
    }
}
