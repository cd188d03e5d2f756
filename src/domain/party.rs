use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The client paying for an appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payer {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    /// Gateway customer id, set once on first payment.
    #[serde(default)]
    pub billing_ref: Option<String>,
}

impl Payer {
    /// Builds the minimal payer record for a user known only to the identity system.
    pub fn from_identity(record: &IdentityRecord) -> Self {
        let display_name = record
            .display_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| {
                record
                    .email
                    .split('@')
                    .next()
                    .unwrap_or_default()
                    .to_string()
            });
        Self {
            id: record.id,
            email: record.email.clone(),
            display_name,
            billing_ref: None,
        }
    }
}

/// The identity system's own record of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub id: Uuid,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// The practitioner receiving the payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payee {
    pub id: Uuid,
    /// Connected payout account, present once payout routing is configured.
    #[serde(default)]
    pub payout_account: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payer_from_identity_uses_display_name() {
        let record = IdentityRecord {
            id: Uuid::new_v4(),
            email: "ana@example.com".to_string(),
            display_name: Some("Ana Lopez".to_string()),
        };
        let payer = Payer::from_identity(&record);
        assert_eq!(payer.id, record.id);
        assert_eq!(payer.display_name, "Ana Lopez");
        assert!(payer.billing_ref.is_none());
    }

    #[test]
    fn test_payer_from_identity_falls_back_to_email_local_part() {
        let record = IdentityRecord {
            id: Uuid::new_v4(),
            email: "ben@example.com".to_string(),
            display_name: Some("  ".to_string()),
        };
        assert_eq!(Payer::from_identity(&record).display_name, "ben");
    }
}
