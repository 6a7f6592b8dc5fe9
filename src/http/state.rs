use std::sync::Arc;

use crate::payments::{PaymentProcessor, DEFAULT_CURRENCY, DEFAULT_ORGANIZATION};
use crate::ratelimit::{RateLimitPolicy, RateLimiter};

/// State shared by all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub rate_limiter: Arc<RateLimiter>,
    /// Policy applied to payment-intent creation
    pub policy: RateLimitPolicy,
    pub payments: Arc<dyn PaymentProcessor>,
    pub default_currency: String,
    pub organization_name: String,
}

impl AppState {
    pub fn new(
        rate_limiter: Arc<RateLimiter>,
        policy: RateLimitPolicy,
        payments: Arc<dyn PaymentProcessor>,
    ) -> Self {
        Self {
            rate_limiter,
            policy,
            payments,
            default_currency: DEFAULT_CURRENCY.to_string(),
            organization_name: DEFAULT_ORGANIZATION.to_string(),
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_currency = currency.into();
        self
    }

    pub fn with_organization(mut self, name: impl Into<String>) -> Self {
        self.organization_name = name.into();
        self
    }
}
