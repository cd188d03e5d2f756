use crate::domain::checkout::{CheckoutSession, CheckoutSessionRequest, CreateCustomerRequest};
use crate::domain::ports::PaymentGateway;
use crate::error::GatewayError;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-process gateway that always runs in test mode.
///
/// Used when no API key is configured, and by tests to observe what would
/// have been sent to the real gateway.
#[derive(Default, Clone)]
pub struct SandboxGateway {
    customer_counter: Arc<AtomicU64>,
    customers: Arc<RwLock<Vec<CreateCustomerRequest>>>,
    sessions: Arc<RwLock<Vec<(CheckoutSessionRequest, CheckoutSession)>>>,
    failure: Option<GatewayError>,
    delay: Option<Duration>,
}

impl SandboxGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with `error`.
    pub fn failing(error: GatewayError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    /// Every call sleeps for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn customers(&self) -> Vec<CreateCustomerRequest> {
        self.customers.read().await.clone()
    }

    pub async fn session_requests(&self) -> Vec<CheckoutSessionRequest> {
        self.sessions
            .read()
            .await
            .iter()
            .map(|(request, _)| request.clone())
            .collect()
    }

    async fn simulate_latency(&self) -> Result<(), GatewayError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PaymentGateway for SandboxGateway {
    async fn create_customer(&self, request: CreateCustomerRequest) -> Result<String, GatewayError> {
        self.simulate_latency().await?;
        let id = format!(
            "cus_test_{}",
            self.customer_counter.fetch_add(1, Ordering::SeqCst)
        );
        self.customers.write().await.push(request);
        Ok(id)
    }

    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        self.simulate_latency().await?;
        let suffix = Uuid::new_v4().simple().to_string();
        let session = CheckoutSession {
            id: format!("cs_test_{suffix}"),
            url: format!("https://checkout.sandbox.invalid/pay/cs_test_{suffix}"),
            payment_intent: Some(format!("pi_test_{suffix}")),
            livemode: false,
        };
        self.sessions.write().await.push((request, session.clone()));
        Ok(session)
    }
}
