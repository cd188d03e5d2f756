use super::checkout::{CheckoutSession, CheckoutSessionRequest, CreateCustomerRequest};
use super::contract::Contract;
use super::party::{IdentityRecord, Payee, Payer};
use super::settlement::{Settlement, SettlementStatus};
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use uuid::Uuid;

/// Profile records owned by the application database.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_payer(&self, payer_id: Uuid) -> Result<Option<Payer>>;
    async fn create_payer(&self, payer: Payer) -> Result<()>;
    async fn set_payer_billing_ref(&self, payer_id: Uuid, billing_ref: &str) -> Result<()>;
    async fn get_payee(&self, payee_id: Uuid) -> Result<Option<Payee>>;
}

/// The authentication system's user records.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn get_identity(&self, user_id: Uuid) -> Result<Option<IdentityRecord>>;
}

#[async_trait]
pub trait ContractStore: Send + Sync {
    /// The single active contract for the payee, if any.
    async fn active_contract(&self, payee_id: Uuid) -> Result<Option<Contract>>;
    /// Counts a confirmed settlement against the payee's active contract.
    ///
    /// Idempotent per settlement: returns `false` when nothing was counted.
    async fn record_settlement(
        &self,
        payee_id: Uuid,
        settlement_id: Uuid,
        on: NaiveDate,
    ) -> Result<bool>;
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> std::result::Result<String, GatewayError>;

    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> std::result::Result<CheckoutSession, GatewayError>;
}

#[async_trait]
pub trait SettlementLedger: Send + Sync {
    /// Inserts a settlement; fails with `DuplicateSettlement` when the
    /// appointment already has a live one.
    async fn insert(&self, settlement: Settlement) -> Result<()>;
    async fn get(&self, settlement_id: Uuid) -> Result<Option<Settlement>>;
    async fn find_by_session(&self, session_id: &str) -> Result<Option<Settlement>>;
    async fn find_by_payment_intent(&self, payment_intent_id: &str) -> Result<Option<Settlement>>;
    /// The live settlement for an appointment, if any.
    async fn find_live_by_appointment(&self, appointment_id: Uuid) -> Result<Option<Settlement>>;
    /// Replaces the stored row only if its status still equals `expected`.
    async fn compare_and_update(
        &self,
        expected: SettlementStatus,
        updated: Settlement,
    ) -> Result<bool>;
    async fn all(&self) -> Result<Vec<Settlement>>;
}

/// Loads reference records (payees, identities, contracts) owned by other
/// systems into a store.
#[async_trait]
pub trait DirectorySeeder: Send + Sync {
    async fn seed_payee(&self, payee: Payee) -> Result<()>;
    async fn seed_identity(&self, record: IdentityRecord) -> Result<()>;
    async fn seed_contract(&self, contract: Contract) -> Result<()>;
}

pub type ProfileStoreRef = Arc<dyn ProfileStore>;
pub type IdentityDirectoryRef = Arc<dyn IdentityDirectory>;
pub type ContractStoreRef = Arc<dyn ContractStore>;
pub type PaymentGatewayRef = Arc<dyn PaymentGateway>;
pub type SettlementLedgerRef = Arc<dyn SettlementLedger>;
pub type DirectorySeederRef = Arc<dyn DirectorySeeder>;
