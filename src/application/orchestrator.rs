use super::checkout::CheckoutSessionBuilder;
use super::identity::BillingIdentityResolver;
use super::ledger::LedgerWriter;
use crate::config::Config;
use crate::domain::checkout::CheckoutDraft;
use crate::domain::commission::CommissionPolicy;
use crate::domain::money::{Currency, Price};
use crate::domain::ports::{
    ContractStoreRef, IdentityDirectoryRef, PaymentGatewayRef, ProfileStoreRef,
    SettlementLedgerRef,
};
use crate::domain::settlement::SettlementParties;
use crate::error::{Result, SettlementError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

/// Inbound payment request from the booking UI.
///
/// Every field is optional on the wire so that validation can name all the
/// missing ones at once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub appointment_id: Option<String>,
    pub amount: Option<Decimal>,
    pub practitioner_id: Option<String>,
    pub client_id: Option<String>,
    pub description: Option<String>,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Clone)]
struct ValidRequest {
    appointment_id: Uuid,
    price: Price,
    payee_id: Uuid,
    payer_id: Uuid,
    description: String,
    success_url: Url,
    cancel_url: Url,
}

impl CheckoutRequest {
    fn validate(self) -> Result<ValidRequest> {
        let missing: Vec<&str> = [
            ("appointmentId", self.appointment_id.as_deref().is_none_or(str::is_empty)),
            ("amount", self.amount.is_none()),
            ("practitionerId", self.practitioner_id.as_deref().is_none_or(str::is_empty)),
            ("clientId", self.client_id.as_deref().is_none_or(str::is_empty)),
            ("successUrl", self.success_url.as_deref().is_none_or(str::is_empty)),
            ("cancelUrl", self.cancel_url.as_deref().is_none_or(str::is_empty)),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();
        if !missing.is_empty() {
            return Err(SettlementError::InvalidInput(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        let appointment_id = parse_id("appointmentId", self.appointment_id)?;
        let description = self
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| format!("Appointment {appointment_id}"));

        Ok(ValidRequest {
            appointment_id,
            price: Price::new(self.amount.unwrap_or_default())?,
            payee_id: parse_id("practitionerId", self.practitioner_id)?,
            payer_id: parse_id("clientId", self.client_id)?,
            description,
            success_url: parse_redirect("successUrl", self.success_url)?,
            cancel_url: parse_redirect("cancelUrl", self.cancel_url)?,
        })
    }
}

fn parse_id(field: &str, value: Option<String>) -> Result<Uuid> {
    let value = value.unwrap_or_default();
    Uuid::parse_str(value.trim())
        .map_err(|_| SettlementError::InvalidInput(format!("{field} is not a valid id: '{value}'")))
}

fn parse_redirect(field: &str, value: Option<String>) -> Result<Url> {
    let value = value.unwrap_or_default();
    let url = Url::parse(value.trim())
        .map_err(|e| SettlementError::InvalidInput(format!("{field}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(SettlementError::InvalidInput(format!(
            "{field} must use http or https, got {other}"
        ))),
    }
}

/// Steps of one payment attempt. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AttemptState {
    Validating,
    ResolvingIdentities,
    ComputingCommission,
    BuildingSession,
    WritingLedger,
    Done,
    Failed,
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttemptState::Validating => "validating",
            AttemptState::ResolvingIdentities => "resolving-identities",
            AttemptState::ComputingCommission => "computing-commission",
            AttemptState::BuildingSession => "building-session",
            AttemptState::WritingLedger => "writing-ledger",
            AttemptState::Done => "done",
            AttemptState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
struct Attempt {
    state: AttemptState,
}

impl Attempt {
    fn start() -> Self {
        Self {
            state: AttemptState::Validating,
        }
    }

    fn advance(&mut self, next: AttemptState) {
        debug_assert!(next > self.state, "attempt cannot move from {} to {next}", self.state);
        tracing::debug!(from = %self.state, to = %next, "attempt state");
        self.state = next;
    }

    fn fail(&mut self, error: &SettlementError) {
        if error.is_reconciliation_hazard() {
            tracing::error!(step = %self.state, error = %error, "payment attempt failed");
        } else {
            tracing::warn!(step = %self.state, error = %error, "payment attempt failed");
        }
        self.state = AttemptState::Failed;
    }
}

/// Ports the orchestrator is wired with.
#[derive(Clone)]
pub struct Collaborators {
    pub profiles: ProfileStoreRef,
    pub identities: IdentityDirectoryRef,
    pub contracts: ContractStoreRef,
    pub gateway: PaymentGatewayRef,
    pub ledger: SettlementLedgerRef,
}

/// Sequences one payment attempt: validate, resolve identities, price,
/// open the checkout session, then record the settlement.
pub struct SettlementOrchestrator {
    profiles: ProfileStoreRef,
    contracts: ContractStoreRef,
    ledger: SettlementLedgerRef,
    resolver: BillingIdentityResolver,
    builder: CheckoutSessionBuilder,
    writer: LedgerWriter,
    policy: CommissionPolicy,
    currency: Currency,
}

impl SettlementOrchestrator {
    pub fn new(collaborators: Collaborators, config: &Config) -> Self {
        Self::with_timeout(collaborators, config, config.gateway.timeout())
    }

    /// Same as `new` with an explicit bound on each gateway call.
    pub fn with_timeout(collaborators: Collaborators, config: &Config, timeout: Duration) -> Self {
        let Collaborators {
            profiles,
            identities,
            contracts,
            gateway,
            ledger,
        } = collaborators;
        Self {
            resolver: BillingIdentityResolver::new(
                profiles.clone(),
                identities,
                gateway.clone(),
                timeout,
            ),
            builder: CheckoutSessionBuilder::new(gateway, timeout),
            writer: LedgerWriter::new(ledger.clone()),
            profiles,
            contracts,
            ledger,
            policy: config.commission.clone(),
            currency: config.currency.clone(),
        }
    }

    pub async fn handle(&self, request: CheckoutRequest) -> Result<CheckoutResponse> {
        let span = tracing::info_span!(
            "checkout_attempt",
            appointment_id = request.appointment_id.as_deref().unwrap_or("")
        );
        async {
            let mut attempt = Attempt::start();
            let result = self.run(&mut attempt, request).await;
            match &result {
                Ok(_) => attempt.advance(AttemptState::Done),
                Err(error) => attempt.fail(error),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(&self, attempt: &mut Attempt, request: CheckoutRequest) -> Result<CheckoutResponse> {
        let request = request.validate()?;

        attempt.advance(AttemptState::ResolvingIdentities);
        let payee = self
            .profiles
            .get_payee(request.payee_id)
            .await?
            .ok_or(SettlementError::PayeeNotFound(request.payee_id))?;
        if let Some(existing) = self.ledger.find_live_by_appointment(request.appointment_id).await? {
            tracing::info!(
                settlement_id = %existing.id,
                session_id = %existing.checkout_session_id,
                "appointment already has a live settlement"
            );
            return Err(SettlementError::DuplicateAttempt(request.appointment_id));
        }
        let payer = self.resolver.resolve(request.payer_id).await?;

        attempt.advance(AttemptState::ComputingCommission);
        let contract = self.contracts.active_contract(payee.id).await?;
        let today = chrono::Utc::now().date_naive();
        let breakdown = self.policy.quote(contract.as_ref(), request.price, today);
        if breakdown.payee_net.is_negative() {
            return Err(SettlementError::NegativePayeeNet {
                total: breakdown.total.value(),
                payee_net: breakdown.payee_net.value(),
            });
        }
        tracing::debug!(
            tier = ?contract.as_ref().map(|c| c.tier),
            platform_commission = %breakdown.platform_commission,
            gateway_fee = %breakdown.gateway_fee,
            payee_net = %breakdown.payee_net,
            "commission computed"
        );

        attempt.advance(AttemptState::BuildingSession);
        let draft = CheckoutDraft {
            payer_billing_ref: payer.billing_ref,
            description: request.description,
            success_url: request.success_url,
            cancel_url: request.cancel_url,
            appointment_id: request.appointment_id,
            payee_id: payee.id,
            payer_id: payer.payer.id,
            breakdown,
            currency: self.currency.clone(),
            payee_payout_account: payee.payout_account,
        };
        let built = self.builder.create(&draft).await?;

        attempt.advance(AttemptState::WritingLedger);
        let parties = SettlementParties {
            appointment_id: request.appointment_id,
            payee_id: payee.id,
            payer_id: payer.payer.id,
        };
        self.writer
            .record(parties, &breakdown, self.currency.clone(), &built)
            .await?;

        Ok(CheckoutResponse {
            session_id: built.session.id,
            url: built.session.url,
        })
    }
}
