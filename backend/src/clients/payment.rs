//! Payment processor client.
//!
//! Checkout creates a payment intent for the booking total and hands its
//! client secret to the storefront; the booking is confirmed later by reading
//! the intent status back.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use super::{check_status, http_client, ClientError, ClientResult};

/// Status of a payment intent as reported by the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Succeeded,
    Canceled,
}

impl PaymentStatus {
    /// The customer can no longer complete this intent.
    pub fn is_failed(&self) -> bool {
        matches!(self, PaymentStatus::Canceled)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntentRequest {
    /// Amount in minor currency units.
    pub amount: i64,
    /// Lowercase ISO currency code.
    pub currency: String,
    pub description: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    pub status: PaymentStatus,
    pub amount: i64,
    pub currency: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(&self, request: &PaymentIntentRequest) -> ClientResult<PaymentIntent>;

    async fn retrieve_intent(&self, intent_id: &str) -> ClientResult<PaymentIntent>;
}

/// Stripe payment intents over the REST API.
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    api_base: String,
}

const STRIPE_API_BASE: &str = "https://api.stripe.com";

impl StripeGateway {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self::with_base_url(secret_key, STRIPE_API_BASE)
    }

    /// Point the client at another API host (a local stub or proxy).
    pub fn with_base_url(secret_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: http_client(30),
            secret_key: secret_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Stripe expects nested metadata as `metadata[key]=value` form fields.
    fn form_fields(request: &PaymentIntentRequest) -> Vec<(String, String)> {
        let mut fields = vec![
            ("amount".to_string(), request.amount.to_string()),
            ("currency".to_string(), request.currency.to_lowercase()),
            ("description".to_string(), request.description.clone()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];
        for (key, value) in &request.metadata {
            fields.push((format!("metadata[{}]", key), value.clone()));
        }
        fields
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(&self, request: &PaymentIntentRequest) -> ClientResult<PaymentIntent> {
        if self.secret_key.is_empty() {
            return Err(ClientError::Configuration(
                "Stripe secret key is not configured".to_string(),
            ));
        }
        let response = self
            .client
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&Self::form_fields(request))
            .send()
            .await?;
        let response = check_status("Stripe", response).await?;
        Ok(response.json::<PaymentIntent>().await?)
    }

    async fn retrieve_intent(&self, intent_id: &str) -> ClientResult<PaymentIntent> {
        let response = self
            .client
            .get(format!("{}/v1/payment_intents/{}", self.api_base, intent_id))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        let response = check_status("Stripe", response).await?;
        Ok(response.json::<PaymentIntent>().await?)
    }
}

/// In-memory gateway for tests and offline development.
///
/// New intents start in `requires_payment_method`; tests move them along with
/// [`MockPaymentGateway::set_status`].
#[derive(Default)]
pub struct MockPaymentGateway {
    intents: Mutex<HashMap<String, PaymentIntent>>,
    counter: AtomicU64,
    fail_create: Mutex<bool>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&self, intent_id: &str, status: PaymentStatus) -> bool {
        match self.intents.lock().get_mut(intent_id) {
            Some(intent) => {
                intent.status = status;
                true
            }
            None => false,
        }
    }

    /// Make subsequent `create_intent` calls fail with a 502-style error.
    pub fn fail_next_creates(&self, fail: bool) {
        *self.fail_create.lock() = fail;
    }

    pub fn intent_count(&self) -> usize {
        self.intents.lock().len()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_intent(&self, request: &PaymentIntentRequest) -> ClientResult<PaymentIntent> {
        if *self.fail_create.lock() {
            return Err(ClientError::Status {
                status: 502,
                body: "payment processor unavailable".to_string(),
            });
        }
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let intent = PaymentIntent {
            id: format!("pi_mock_{}", n),
            client_secret: format!("pi_mock_{}_secret", n),
            status: PaymentStatus::RequiresPaymentMethod,
            amount: request.amount,
            currency: request.currency.to_lowercase(),
        };
        self.intents
            .lock()
            .insert(intent.id.clone(), intent.clone());
        Ok(intent)
    }

    async fn retrieve_intent(&self, intent_id: &str) -> ClientResult<PaymentIntent> {
        // Suspend once, as a network round trip would.
        tokio::task::yield_now().await;
        self.intents
            .lock()
            .get(intent_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("payment intent {}", intent_id)))
    }
}
