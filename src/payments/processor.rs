//! Payment processor abstraction.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use super::donation::Donation;

/// Currency used when the request does not name one.
pub const DEFAULT_CURRENCY: &str = "usd";
/// Organization named in payment descriptions unless configured.
pub const DEFAULT_ORGANIZATION: &str = "Beacon of Blessings";

/// Errors returned by a payment processor.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// No API credentials are configured
    #[error("payment processor secret key is not configured")]
    NotConfigured,

    /// The processor rejected the request
    #[error("payment processor returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The processor could not be reached or its reply could not be read
    #[error("payment processor request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Everything needed to create a payment intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntentParams {
    /// Amount in the currency's smallest unit
    pub amount: i64,
    pub currency: String,
    pub description: String,
    pub receipt_email: String,
    /// Key/value metadata, each key at most once
    pub metadata: Vec<(String, String)>,
}

impl PaymentIntentParams {
    /// Build the parameters for a validated donation.
    ///
    /// Donor name and email always go into the metadata. Fields set in the
    /// request's own metadata replace them or are appended.
    pub fn for_donation(donation: &Donation, default_currency: &str, organization: &str) -> Self {
        let mut metadata = vec![
            ("donorName".to_string(), donation.donor_name.clone()),
            ("email".to_string(), donation.email.clone()),
        ];
        if let Some(extra) = &donation.metadata {
            let fields = [
                ("donorName", &extra.donor_name),
                ("email", &extra.email),
                ("dedication", &extra.dedication),
                ("dedicationType", &extra.dedication_type),
            ];
            for (name, value) in fields {
                let Some(value) = value else {
                    continue;
                };
                match metadata.iter().position(|(key, _)| key.as_str() == name) {
                    Some(index) => metadata[index].1 = value.clone(),
                    None => metadata.push((name.to_string(), value.clone())),
                }
            }
        }

        Self {
            amount: donation.amount,
            currency: donation
                .currency
                .clone()
                .unwrap_or_else(|| default_currency.to_string()),
            description: format!("Donation to {} from {}", organization, donation.donor_name),
            receipt_email: donation.email.clone(),
            metadata,
        }
    }
}

/// A created payment intent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    /// Secret handed to the browser to confirm the payment
    #[serde(default)]
    pub client_secret: Option<String>,
}

/// A service able to create payment intents.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Create a payment intent with automatic payment methods enabled.
    async fn create_payment_intent(
        &self,
        params: &PaymentIntentParams,
    ) -> Result<PaymentIntent, PaymentError>;
}
