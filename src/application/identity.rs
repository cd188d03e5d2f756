use super::bounded;
use crate::domain::checkout::CreateCustomerRequest;
use crate::domain::party::Payer;
use crate::domain::ports::{IdentityDirectoryRef, PaymentGatewayRef, ProfileStoreRef};
use crate::error::{Result, SettlementError};
use std::time::Duration;
use uuid::Uuid;

/// A payer together with the gateway customer they are billed as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPayer {
    pub payer: Payer,
    pub billing_ref: String,
    /// True when this call created the gateway customer.
    pub created: bool,
}

/// Ensures a payer has a durable identity in the gateway's customer registry.
pub struct BillingIdentityResolver {
    profiles: ProfileStoreRef,
    identities: IdentityDirectoryRef,
    gateway: PaymentGatewayRef,
    timeout: Duration,
}

impl BillingIdentityResolver {
    pub fn new(
        profiles: ProfileStoreRef,
        identities: IdentityDirectoryRef,
        gateway: PaymentGatewayRef,
        timeout: Duration,
    ) -> Self {
        Self {
            profiles,
            identities,
            gateway,
            timeout,
        }
    }

    /// Returns the payer's billing reference, creating and storing one on first use.
    pub async fn resolve(&self, payer_id: Uuid) -> Result<ResolvedPayer> {
        let payer = match self.lookup_profile(payer_id).await? {
            Some(payer) => payer,
            None => self.provision_from_identity(payer_id).await?,
        };

        if let Some(billing_ref) = payer.billing_ref.clone() {
            return Ok(ResolvedPayer {
                payer,
                billing_ref,
                created: false,
            });
        }

        let created_ref = self.create_billing_identity(&payer).await?;
        let billing_ref = self.persist_billing_ref(&payer, &created_ref).await?;
        tracing::info!(
            payer_id = %payer.id,
            billing_ref = %billing_ref,
            "linked payer to gateway customer"
        );

        Ok(ResolvedPayer {
            payer: Payer {
                billing_ref: Some(billing_ref.clone()),
                ..payer
            },
            billing_ref,
            created: true,
        })
    }

    async fn lookup_profile(&self, payer_id: Uuid) -> Result<Option<Payer>> {
        self.profiles.get_payer(payer_id).await
    }

    /// Self-healing path for users who signed up but never got a profile row.
    async fn provision_from_identity(&self, payer_id: Uuid) -> Result<Payer> {
        let record = self
            .identities
            .get_identity(payer_id)
            .await?
            .ok_or(SettlementError::PayerNotFound(payer_id))?;

        let payer = Payer::from_identity(&record);
        self.profiles.create_payer(payer.clone()).await?;
        tracing::warn!(payer_id = %payer_id, "provisioned missing payer profile from identity record");

        // A concurrent attempt may have provisioned (and linked) first.
        Ok(self.profiles.get_payer(payer_id).await?.unwrap_or(payer))
    }

    async fn create_billing_identity(&self, payer: &Payer) -> Result<String> {
        let request = CreateCustomerRequest {
            email: payer.email.clone(),
            name: payer.display_name.clone(),
            payer_id: payer.id,
        };
        bounded(
            self.timeout,
            "create_customer",
            self.gateway.create_customer(request),
        )
        .await
        .map_err(SettlementError::CheckoutCreationFailed)
    }

    /// Stores the reference and returns whichever one the store kept.
    async fn persist_billing_ref(&self, payer: &Payer, billing_ref: &str) -> Result<String> {
        self.profiles.set_payer_billing_ref(payer.id, billing_ref).await?;
        let stored = self
            .profiles
            .get_payer(payer.id)
            .await?
            .and_then(|p| p.billing_ref)
            .unwrap_or_else(|| billing_ref.to_string());
        Ok(stored)
    }
}
