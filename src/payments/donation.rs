//! Donation request payload and validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest accepted donation, in cents ($1).
pub const MIN_AMOUNT_CENTS: i64 = 100;
/// Largest accepted donation, in cents ($999,999).
pub const MAX_AMOUNT_CENTS: i64 = 99_999_900;
/// Minimum donor name length after trimming.
const MIN_DONOR_NAME_CHARS: usize = 2;

/// Body of a payment-intent creation request, as received.
///
/// Required fields are optional here so a missing or `null` value is
/// reported by [`validate`](Self::validate) rather than as a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationRequest {
    /// Amount in cents
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub donor_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub metadata: Option<DonationMetadata>,
}

/// A donation that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Donation {
    /// Amount in cents
    pub amount: i64,
    pub currency: Option<String>,
    pub donor_name: String,
    pub email: String,
    pub metadata: Option<DonationMetadata>,
}

/// Extra fields attached to the payment intent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationMetadata {
    #[serde(default)]
    pub donor_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub dedication: Option<String>,
    #[serde(default)]
    pub dedication_type: Option<String>,
}

/// Why a donation request was rejected.
///
/// The messages are returned to the caller verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid amount. Must be between $1 and $999,999")]
    Amount,
    #[error("Invalid email address")]
    Email,
    #[error("Invalid donor name")]
    DonorName,
}

impl DonationRequest {
    /// Check amount, email and donor name, in that order.
    pub fn validate(self) -> Result<Donation, ValidationError> {
        let amount = self
            .amount
            .filter(|amount| (MIN_AMOUNT_CENTS..=MAX_AMOUNT_CENTS).contains(amount))
            .ok_or(ValidationError::Amount)?;
        let email = self
            .email
            .filter(|email| is_valid_email(email))
            .ok_or(ValidationError::Email)?;
        let donor_name = self
            .donor_name
            .filter(|name| name.trim().chars().count() >= MIN_DONOR_NAME_CHARS)
            .ok_or(ValidationError::DonorName)?;

        Ok(Donation {
            amount,
            currency: self.currency,
            donor_name,
            email,
            metadata: self.metadata,
        })
    }
}

/// `local@domain.tld` with no whitespace and exactly one `@`.
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    // Some dot must have at least one character on each side.
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}
