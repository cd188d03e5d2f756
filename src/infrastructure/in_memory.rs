use crate::domain::contract::Contract;
use crate::domain::party::{IdentityRecord, Payee, Payer};
use crate::domain::ports::{
    ContractStore, DirectorySeeder, IdentityDirectory, ProfileStore, SettlementLedger,
};
use crate::domain::settlement::{Settlement, SettlementStatus};
use crate::error::{Result, SettlementError};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A thread-safe in-memory store for payer and payee profiles.
#[derive(Default, Clone)]
pub struct InMemoryProfileStore {
    payers: Arc<RwLock<HashMap<Uuid, Payer>>>,
    payees: Arc<RwLock<HashMap<Uuid, Payee>>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_payee(&self, payee: Payee) {
        self.payees.write().await.insert(payee.id, payee);
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get_payer(&self, payer_id: Uuid) -> Result<Option<Payer>> {
        Ok(self.payers.read().await.get(&payer_id).cloned())
    }

    async fn create_payer(&self, payer: Payer) -> Result<()> {
        self.payers.write().await.entry(payer.id).or_insert(payer);
        Ok(())
    }

    async fn set_payer_billing_ref(&self, payer_id: Uuid, billing_ref: &str) -> Result<()> {
        let mut payers = self.payers.write().await;
        let payer = payers
            .get_mut(&payer_id)
            .ok_or(SettlementError::PayerNotFound(payer_id))?;
        // Set at most once.
        if payer.billing_ref.is_none() {
            payer.billing_ref = Some(billing_ref.to_string());
        }
        Ok(())
    }

    async fn get_payee(&self, payee_id: Uuid) -> Result<Option<Payee>> {
        Ok(self.payees.read().await.get(&payee_id).cloned())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryIdentityDirectory {
    identities: Arc<RwLock<HashMap<Uuid, IdentityRecord>>>,
}

impl InMemoryIdentityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, record: IdentityRecord) {
        self.identities.write().await.insert(record.id, record);
    }
}

#[async_trait]
impl IdentityDirectory for InMemoryIdentityDirectory {
    async fn get_identity(&self, user_id: Uuid) -> Result<Option<IdentityRecord>> {
        Ok(self.identities.read().await.get(&user_id).cloned())
    }
}

/// Contracts keyed by payee; only one contract per payee is kept.
#[derive(Default, Clone)]
pub struct InMemoryContractStore {
    contracts: Arc<RwLock<HashMap<Uuid, Contract>>>,
}

impl InMemoryContractStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, contract: Contract) {
        self.contracts.write().await.insert(contract.payee_id, contract);
    }

    pub async fn get(&self, payee_id: Uuid) -> Option<Contract> {
        self.contracts.read().await.get(&payee_id).cloned()
    }
}

#[async_trait]
impl ContractStore for InMemoryContractStore {
    async fn active_contract(&self, payee_id: Uuid) -> Result<Option<Contract>> {
        Ok(self
            .contracts
            .read()
            .await
            .get(&payee_id)
            .filter(|c| c.is_active())
            .cloned())
    }

    async fn record_settlement(
        &self,
        payee_id: Uuid,
        settlement_id: Uuid,
        on: NaiveDate,
    ) -> Result<bool> {
        Ok(self
            .contracts
            .write()
            .await
            .get_mut(&payee_id)
            .filter(|c| c.is_active())
            .is_some_and(|contract| contract.record_settlement(settlement_id, on)))
    }
}

/// In-memory ledger. The appointment uniqueness check and the insert happen
/// under one write lock, which is this store's uniqueness constraint.
#[derive(Default, Clone)]
pub struct InMemorySettlementLedger {
    settlements: Arc<RwLock<HashMap<Uuid, Settlement>>>,
}

impl InMemorySettlementLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettlementLedger for InMemorySettlementLedger {
    async fn insert(&self, settlement: Settlement) -> Result<()> {
        let mut settlements = self.settlements.write().await;
        let conflict = settlements
            .values()
            .any(|s| s.appointment_id == settlement.appointment_id && s.status.is_live());
        if conflict {
            return Err(SettlementError::DuplicateSettlement(settlement.appointment_id));
        }
        settlements.insert(settlement.id, settlement);
        Ok(())
    }

    async fn get(&self, settlement_id: Uuid) -> Result<Option<Settlement>> {
        Ok(self.settlements.read().await.get(&settlement_id).cloned())
    }

    async fn find_by_session(&self, session_id: &str) -> Result<Option<Settlement>> {
        Ok(self
            .settlements
            .read()
            .await
            .values()
            .find(|s| s.checkout_session_id == session_id)
            .cloned())
    }

    async fn find_by_payment_intent(&self, payment_intent_id: &str) -> Result<Option<Settlement>> {
        Ok(self
            .settlements
            .read()
            .await
            .values()
            .find(|s| s.payment_intent_id.as_deref() == Some(payment_intent_id))
            .cloned())
    }

    async fn find_live_by_appointment(&self, appointment_id: Uuid) -> Result<Option<Settlement>> {
        Ok(self
            .settlements
            .read()
            .await
            .values()
            .find(|s| s.appointment_id == appointment_id && s.status.is_live())
            .cloned())
    }

    async fn compare_and_update(
        &self,
        expected: SettlementStatus,
        updated: Settlement,
    ) -> Result<bool> {
        let mut settlements = self.settlements.write().await;
        match settlements.get_mut(&updated.id) {
            Some(current) if current.status == expected => {
                *current = updated;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(SettlementError::SettlementNotFound(updated.id.to_string())),
        }
    }

    async fn all(&self) -> Result<Vec<Settlement>> {
        let mut all: Vec<Settlement> = self.settlements.read().await.values().cloned().collect();
        all.sort_by_key(|s| s.created_at);
        Ok(all)
    }
}

/// All in-memory stores behind one handle; clones share state.
#[derive(Default, Clone)]
pub struct InMemoryStores {
    pub profiles: InMemoryProfileStore,
    pub identities: InMemoryIdentityDirectory,
    pub contracts: InMemoryContractStore,
    pub ledger: InMemorySettlementLedger,
}

impl InMemoryStores {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DirectorySeeder for InMemoryStores {
    async fn seed_payee(&self, payee: Payee) -> Result<()> {
        self.profiles.insert_payee(payee).await;
        Ok(())
    }

    async fn seed_identity(&self, record: IdentityRecord) -> Result<()> {
        self.identities.insert(record).await;
        Ok(())
    }

    async fn seed_contract(&self, contract: Contract) -> Result<()> {
        self.contracts.insert(contract).await;
        Ok(())
    }
}
