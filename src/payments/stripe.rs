//! Stripe REST client for payment intents.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::processor::{PaymentError, PaymentIntent, PaymentIntentParams, PaymentProcessor};

/// Production Stripe API host.
pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";
/// API version pinned on every request.
pub const DEFAULT_API_VERSION: &str = "2025-10-29.clover";

/// Creates payment intents through `POST /v1/payment_intents`.
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: Option<String>,
    api_base: String,
    api_version: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl StripeClient {
    /// Create a client. Without a secret key every call fails with
    /// [`PaymentError::NotConfigured`].
    pub fn new(secret_key: Option<String>, api_base: &str, api_version: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key: secret_key.filter(|key| !key.is_empty()),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_version: api_version.to_string(),
        }
    }

    /// Whether a secret key is present.
    pub fn is_configured(&self) -> bool {
        self.secret_key.is_some()
    }

    fn form(params: &PaymentIntentParams) -> Vec<(String, String)> {
        let mut form = vec![
            ("amount".to_string(), params.amount.to_string()),
            ("currency".to_string(), params.currency.clone()),
            ("automatic_payment_methods[enabled]".to_string(), "true".to_string()),
            ("description".to_string(), params.description.clone()),
            ("receipt_email".to_string(), params.receipt_email.clone()),
        ];
        form.extend(
            params
                .metadata
                .iter()
                .map(|(key, value)| (format!("metadata[{key}]"), value.clone())),
        );
        form
    }
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    #[instrument(skip(self, params), fields(amount = params.amount, currency = %params.currency))]
    async fn create_payment_intent(
        &self,
        params: &PaymentIntentParams,
    ) -> Result<PaymentIntent, PaymentError> {
        let secret_key = self.secret_key.as_deref().ok_or(PaymentError::NotConfigured)?;

        let response = self
            .http
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(secret_key)
            .header("Stripe-Version", self.api_version.as_str())
            .form(&Self::form(params))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let intent: PaymentIntent = response.json().await?;
            debug!(payment_intent = %intent.id, "Payment intent created");
            return Ok(intent);
        }

        let message = response
            .json::<ErrorEnvelope>()
            .await
            .ok()
            .and_then(|envelope| envelope.error.message)
            .unwrap_or_else(|| status.to_string());

        Err(PaymentError::Api {
            status: status.as_u16(),
            message,
        })
    }
}
