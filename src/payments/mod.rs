//! Donation payloads and payment processor integration.

mod donation;
mod processor;
mod stripe;

pub use donation::{
    Donation, DonationMetadata, DonationRequest, ValidationError, MAX_AMOUNT_CENTS, MIN_AMOUNT_CENTS,
};
pub use processor::{
    PaymentError, PaymentIntent, PaymentIntentParams, PaymentProcessor, DEFAULT_CURRENCY,
    DEFAULT_ORGANIZATION,
};
pub use stripe::{StripeClient, DEFAULT_API_BASE, DEFAULT_API_VERSION};
