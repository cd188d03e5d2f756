//! Gateway adapter for Stripe's REST API.
//!
//! Requests are form-encoded, authenticated with the secret key as a bearer
//! token, and carry an `Idempotency-Key`. Customer keys are derived from the
//! payer id, so repeating a customer creation returns the same customer.
//! Session keys come from the request and are unique per checkout attempt.

use crate::config::GatewayConfig;
use crate::domain::checkout::{CheckoutSession, CheckoutSessionRequest, CreateCustomerRequest};
use crate::domain::ports::PaymentGateway;
use crate::error::{GatewayError, Result, SettlementError};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

const CUSTOMERS_PATH: &str = "/v1/customers";
const CHECKOUT_SESSIONS_PATH: &str = "/v1/checkout/sessions";
const MAX_ERROR_BODY: usize = 256;

pub struct StripeGateway {
    client: Client,
    base_url: Url,
    api_key: SecretString,
    timeout: Duration,
}

#[derive(Deserialize)]
struct CustomerObject {
    id: String,
}

#[derive(Deserialize)]
struct SessionObject {
    id: String,
    url: Option<String>,
    payment_intent: Option<String>,
    #[serde(default)]
    livemode: bool,
}

impl StripeGateway {
    pub fn new(api_key: SecretString, config: &GatewayConfig) -> Result<Self> {
        Self::with_timeout(api_key, &config.base_url, config.timeout())
    }

    pub fn with_timeout(api_key: SecretString, base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| SettlementError::Config(format!("gateway base url: {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SettlementError::Config(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url,
            api_key,
            timeout,
        })
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        idempotency_key: &str,
        form: &[(String, String)],
    ) -> std::result::Result<T, GatewayError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| GatewayError::Transport {
                operation: operation.to_string(),
                message: e.to_string(),
            })?;

        let response = self
            .client
            .post(url)
            .bearer_auth(self.api_key.expose_secret())
            .header("Idempotency-Key", idempotency_key)
            .form(form)
            .send()
            .await
            .map_err(|e| self.classify(operation, e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(operation, e))?;
        if !status.is_success() {
            tracing::warn!(
                target: "booking_settlement::gateway",
                operation,
                status = status.as_u16(),
                "gateway rejected request"
            );
            return Err(GatewayError::Rejected {
                operation: operation.to_string(),
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| GatewayError::InvalidResponse {
            operation: operation.to_string(),
            message: e.to_string(),
        })
    }

    fn classify(&self, operation: &str, error: reqwest::Error) -> GatewayError {
        if error.is_timeout() {
            GatewayError::Timeout {
                operation: operation.to_string(),
                seconds: self.timeout.as_secs(),
            }
        } else {
            GatewayError::Transport {
                operation: operation.to_string(),
                message: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> std::result::Result<String, GatewayError> {
        let key = format!("customer:{}", request.payer_id);
        let customer: CustomerObject = self
            .post_form("create_customer", CUSTOMERS_PATH, &key, &customer_form(&request))
            .await?;
        Ok(customer.id)
    }

    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> std::result::Result<CheckoutSession, GatewayError> {
        let operation = "create_checkout_session";
        let session: SessionObject = self
            .post_form(
                operation,
                CHECKOUT_SESSIONS_PATH,
                &request.idempotency_key,
                &checkout_form(&request),
            )
            .await?;
        let url = session.url.ok_or_else(|| GatewayError::InvalidResponse {
            operation: operation.to_string(),
            message: format!("session {} has no url", session.id),
        })?;
        Ok(CheckoutSession {
            id: session.id,
            url,
            payment_intent: session.payment_intent,
            livemode: session.livemode,
        })
    }
}

pub fn customer_form(request: &CreateCustomerRequest) -> Vec<(String, String)> {
    vec![
        ("email".to_string(), request.email.clone()),
        ("name".to_string(), request.name.clone()),
        ("metadata[payer_id]".to_string(), request.payer_id.to_string()),
    ]
}

/// Flattens a session request into Stripe's bracketed form fields.
pub fn checkout_form(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let item = &request.line_item;
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("customer".to_string(), request.customer.clone()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        ("line_items[0][quantity]".to_string(), item.quantity.to_string()),
        (
            "line_items[0][price_data][currency]".to_string(),
            item.currency.to_string(),
        ),
        (
            "line_items[0][price_data][unit_amount]".to_string(),
            item.unit_amount.to_string(),
        ),
        (
            "line_items[0][price_data][product_data][name]".to_string(),
            item.name.clone(),
        ),
    ];

    for (key, value) in &request.metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
        form.push((format!("payment_intent_data[metadata][{key}]"), value.clone()));
    }

    if let Some(split) = &request.split {
        form.push((
            "payment_intent_data[application_fee_amount]".to_string(),
            split.application_fee_amount.to_string(),
        ));
        form.push((
            "payment_intent_data[transfer_data][destination]".to_string(),
            split.destination.clone(),
        ));
    }
    form
}

/// Pulls `error.message` out of a Stripe error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.chars().take(MAX_ERROR_BODY).collect())
}
