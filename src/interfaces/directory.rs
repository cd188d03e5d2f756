//! JSON seed describing the records this subsystem reads but does not own:
//! payer profiles, payees, identity records and contracts.

use crate::domain::contract::{Contract, ContractStatus, ContractTier};
use crate::domain::party::{IdentityRecord, Payee, Payer};
use crate::domain::ports::{DirectorySeeder, ProfileStore};
use crate::error::{Result, SettlementError};
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Directory {
    pub payers: Vec<Payer>,
    pub payees: Vec<Payee>,
    pub identities: Vec<IdentityRecord>,
    pub contracts: Vec<ContractSeed>,
}

/// A contract as written in a seed file. The period defaults to the current
/// month so that `settled_this_period` counts toward today's quotes.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractSeed {
    pub payee_id: Uuid,
    pub tier: ContractTier,
    #[serde(default)]
    pub settled_this_period: u32,
    #[serde(default)]
    pub period_started_on: Option<NaiveDate>,
    #[serde(default = "active")]
    pub status: ContractStatus,
}

fn active() -> ContractStatus {
    ContractStatus::Active
}

impl ContractSeed {
    pub fn into_contract(self, today: NaiveDate) -> Contract {
        Contract {
            payee_id: self.payee_id,
            tier: self.tier,
            settled_this_period: self.settled_this_period,
            counted_this_period: Default::default(),
            period_started_on: self
                .period_started_on
                .unwrap_or_else(|| today.with_day(1).unwrap_or(today)),
            status: self.status,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub payers: usize,
    pub payees: usize,
    pub identities: usize,
    pub contracts: usize,
}

impl Directory {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| SettlementError::InvalidInput(format!("{}: {e}", path.display())))
    }

    /// Writes every record through the given stores. Existing payers keep
    /// their billing reference.
    pub async fn seed(
        self,
        profiles: &dyn ProfileStore,
        seeder: &dyn DirectorySeeder,
        today: NaiveDate,
    ) -> Result<SeedSummary> {
        let summary = SeedSummary {
            payers: self.payers.len(),
            payees: self.payees.len(),
            identities: self.identities.len(),
            contracts: self.contracts.len(),
        };
        for payer in self.payers {
            profiles.create_payer(payer).await?;
        }
        for payee in self.payees {
            seeder.seed_payee(payee).await?;
        }
        for record in self.identities {
            seeder.seed_identity(record).await?;
        }
        for contract in self.contracts {
            seeder.seed_contract(contract.into_contract(today)).await?;
        }
        tracing::debug!(?summary, "directory seeded");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::ContractStore;
    use crate::infrastructure::in_memory::InMemoryStores;
    use std::io::Write;

    const SEED: &str = r#"{
        "payers": [{"id":"00000000-0000-4000-8000-0000000000b1","email":"c@example.com","display_name":"C"}],
        "payees": [{"id":"00000000-0000-4000-8000-0000000000a1","payout_account":"acct_1"}],
        "identities": [{"id":"00000000-0000-4000-8000-0000000000c1","email":"new@example.com"}],
        "contracts": [{"payee_id":"00000000-0000-4000-8000-0000000000a1","tier":"flat-low","settled_this_period":3}]
    }"#;

    #[tokio::test]
    async fn test_seed_into_memory() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SEED.as_bytes()).unwrap();
        let directory = Directory::load(file.path()).unwrap();

        let stores = InMemoryStores::new();
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let summary = directory.seed(&stores.profiles, &stores, today).await.unwrap();
        assert_eq!(
            summary,
            SeedSummary {
                payers: 1,
                payees: 1,
                identities: 1,
                contracts: 1
            }
        );

        let payee_id = Uuid::parse_str("00000000-0000-4000-8000-0000000000a1").unwrap();
        let contract = stores.contracts.active_contract(payee_id).await.unwrap().unwrap();
        assert_eq!(contract.period_started_on, NaiveDate::from_ymd_opt(2026, 10, 1).unwrap());
        assert_eq!(contract.settlements_in_period(today), 3);
    }

    #[test]
    fn test_unknown_tier_is_invalid_input() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"contracts":[{"payee_id":"00000000-0000-4000-8000-0000000000a1","tier":"gold"}]}"#)
            .unwrap();
        assert!(matches!(
            Directory::load(file.path()),
            Err(SettlementError::InvalidInput(_))
        ));
    }
}
