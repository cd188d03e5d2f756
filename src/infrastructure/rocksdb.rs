use crate::domain::contract::Contract;
use crate::domain::party::{IdentityRecord, Payee, Payer};
use crate::domain::ports::{
    ContractStore, DirectorySeeder, IdentityDirectory, ProfileStore, SettlementLedger,
};
use crate::domain::settlement::{Settlement, SettlementStatus};
use crate::error::{Result, SettlementError};
use async_trait::async_trait;
use chrono::NaiveDate;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

pub const CF_PAYERS: &str = "payers";
pub const CF_PAYEES: &str = "payees";
pub const CF_IDENTITIES: &str = "identities";
pub const CF_CONTRACTS: &str = "contracts";
pub const CF_SETTLEMENTS: &str = "settlements";
/// appointment id -> id of its live settlement
pub const CF_APPOINTMENTS: &str = "appointments";
/// checkout session id -> settlement id
pub const CF_SESSIONS: &str = "sessions";
/// payment intent id -> settlement id
pub const CF_PAYMENT_INTENTS: &str = "payment_intents";

const COLUMN_FAMILIES: [&str; 8] = [
    CF_PAYERS,
    CF_PAYEES,
    CF_IDENTITIES,
    CF_CONTRACTS,
    CF_SETTLEMENTS,
    CF_APPOINTMENTS,
    CF_SESSIONS,
    CF_PAYMENT_INTENTS,
];

/// A persistent store implementation using RocksDB.
///
/// Every record type lives in its own column family as JSON. Read-modify-write
/// operations are serialized by one writer lock, which also makes the
/// appointment index a uniqueness constraint for live settlements.
///
/// `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    writer: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at `path`, creating any missing
    /// column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect::<Vec<_>>();
        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            writer: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| SettlementError::Storage(format!("column family '{name}' not found")))
    }

    fn read<T: DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>> {
        match self.db.get_cf(self.cf(cf)?, key)? {
            Some(bytes) => decode(cf, &bytes).map(Some),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, cf: &str, key: &[u8], value: &T) -> Result<()> {
        self.db.put_cf(self.cf(cf)?, key, encode(value)?)?;
        Ok(())
    }

    fn settlement_via(&self, index: &str, key: &[u8]) -> Result<Option<Settlement>> {
        match self.db.get_cf(self.cf(index)?, key)? {
            Some(settlement_id) => self.read(CF_SETTLEMENTS, &settlement_id),
            None => Ok(None),
        }
    }

    fn index_settlement(&self, batch: &mut WriteBatch, settlement: &Settlement) -> Result<()> {
        let id = settlement.id.as_bytes();
        batch.put_cf(self.cf(CF_SETTLEMENTS)?, id, encode(settlement)?);
        batch.put_cf(self.cf(CF_SESSIONS)?, settlement.checkout_session_id.as_bytes(), id);
        if let Some(intent) = &settlement.payment_intent_id {
            batch.put_cf(self.cf(CF_PAYMENT_INTENTS)?, intent.as_bytes(), id);
        }
        Ok(())
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| SettlementError::Storage(format!("serialization error: {e}")))
}

fn decode<T: DeserializeOwned>(cf: &str, bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| SettlementError::Storage(format!("corrupt record in '{cf}': {e}")))
}

#[async_trait]
impl ProfileStore for RocksDBStore {
    async fn get_payer(&self, payer_id: Uuid) -> Result<Option<Payer>> {
        self.read(CF_PAYERS, payer_id.as_bytes())
    }

    async fn create_payer(&self, payer: Payer) -> Result<()> {
        let _guard = self.writer.lock().await;
        if self.read::<Payer>(CF_PAYERS, payer.id.as_bytes())?.is_none() {
            self.write(CF_PAYERS, payer.id.as_bytes(), &payer)?;
        }
        Ok(())
    }

    async fn set_payer_billing_ref(&self, payer_id: Uuid, billing_ref: &str) -> Result<()> {
        let _guard = self.writer.lock().await;
        let mut payer: Payer = self
            .read(CF_PAYERS, payer_id.as_bytes())?
            .ok_or(SettlementError::PayerNotFound(payer_id))?;
        if payer.billing_ref.is_none() {
            payer.billing_ref = Some(billing_ref.to_string());
            self.write(CF_PAYERS, payer_id.as_bytes(), &payer)?;
        }
        Ok(())
    }

    async fn get_payee(&self, payee_id: Uuid) -> Result<Option<Payee>> {
        self.read(CF_PAYEES, payee_id.as_bytes())
    }
}

#[async_trait]
impl IdentityDirectory for RocksDBStore {
    async fn get_identity(&self, user_id: Uuid) -> Result<Option<IdentityRecord>> {
        self.read(CF_IDENTITIES, user_id.as_bytes())
    }
}

#[async_trait]
impl ContractStore for RocksDBStore {
    async fn active_contract(&self, payee_id: Uuid) -> Result<Option<Contract>> {
        Ok(self
            .read::<Contract>(CF_CONTRACTS, payee_id.as_bytes())?
            .filter(|c| c.is_active()))
    }

    async fn record_settlement(
        &self,
        payee_id: Uuid,
        settlement_id: Uuid,
        on: NaiveDate,
    ) -> Result<bool> {
        let _guard = self.writer.lock().await;
        let Some(mut contract) = self.active_contract(payee_id).await? else {
            return Ok(false);
        };
        if !contract.record_settlement(settlement_id, on) {
            return Ok(false);
        }
        self.write(CF_CONTRACTS, payee_id.as_bytes(), &contract)?;
        Ok(true)
    }
}

#[async_trait]
impl SettlementLedger for RocksDBStore {
    async fn insert(&self, settlement: Settlement) -> Result<()> {
        let _guard = self.writer.lock().await;
        let appointment_key = settlement.appointment_id.as_bytes();
        if let Some(existing) = self.settlement_via(CF_APPOINTMENTS, appointment_key)? {
            if existing.status.is_live() {
                return Err(SettlementError::DuplicateSettlement(settlement.appointment_id));
            }
        }

        let mut batch = WriteBatch::default();
        self.index_settlement(&mut batch, &settlement)?;
        batch.put_cf(self.cf(CF_APPOINTMENTS)?, appointment_key, settlement.id.as_bytes());
        self.db.write(batch)?;
        Ok(())
    }

    async fn get(&self, settlement_id: Uuid) -> Result<Option<Settlement>> {
        self.read(CF_SETTLEMENTS, settlement_id.as_bytes())
    }

    async fn find_by_session(&self, session_id: &str) -> Result<Option<Settlement>> {
        self.settlement_via(CF_SESSIONS, session_id.as_bytes())
    }

    async fn find_by_payment_intent(&self, payment_intent_id: &str) -> Result<Option<Settlement>> {
        self.settlement_via(CF_PAYMENT_INTENTS, payment_intent_id.as_bytes())
    }

    async fn find_live_by_appointment(&self, appointment_id: Uuid) -> Result<Option<Settlement>> {
        Ok(self
            .settlement_via(CF_APPOINTMENTS, appointment_id.as_bytes())?
            .filter(|s| s.status.is_live()))
    }

    async fn compare_and_update(
        &self,
        expected: SettlementStatus,
        updated: Settlement,
    ) -> Result<bool> {
        let _guard = self.writer.lock().await;
        let current: Settlement = self
            .read(CF_SETTLEMENTS, updated.id.as_bytes())?
            .ok_or_else(|| SettlementError::SettlementNotFound(updated.id.to_string()))?;
        if current.status != expected {
            return Ok(false);
        }

        let mut batch = WriteBatch::default();
        self.index_settlement(&mut batch, &updated)?;
        if !updated.status.is_live() {
            batch.delete_cf(self.cf(CF_APPOINTMENTS)?, updated.appointment_id.as_bytes());
        }
        self.db.write(batch)?;
        Ok(true)
    }

    async fn all(&self) -> Result<Vec<Settlement>> {
        let mut settlements = Vec::new();
        for item in self.db.iterator_cf(self.cf(CF_SETTLEMENTS)?, IteratorMode::Start) {
            let (_key, value) = item?;
            settlements.push(decode::<Settlement>(CF_SETTLEMENTS, &value)?);
        }
        settlements.sort_by_key(|s| s.created_at);
        Ok(settlements)
    }
}

#[async_trait]
impl DirectorySeeder for RocksDBStore {
    async fn seed_payee(&self, payee: Payee) -> Result<()> {
        self.write(CF_PAYEES, payee.id.as_bytes(), &payee)
    }

    async fn seed_identity(&self, record: IdentityRecord) -> Result<()> {
        self.write(CF_IDENTITIES, record.id.as_bytes(), &record)
    }

    /// Existing contracts keep their running count.
    async fn seed_contract(&self, contract: Contract) -> Result<()> {
        let _guard = self.writer.lock().await;
        if self.read::<Contract>(CF_CONTRACTS, contract.payee_id.as_bytes())?.is_none() {
            self.write(CF_CONTRACTS, contract.payee_id.as_bytes(), &contract)?;
        }
        Ok(())
    }
}
