//! Rate limit policy and per-key window record.

use std::time::Duration;

use crate::error::{GatewayError, Result};

/// Requests admitted per window on the payment-intent endpoint.
pub const PAYMENT_INTENT_MAX_REQUESTS: u32 = 5;
/// Window length on the payment-intent endpoint.
pub const PAYMENT_INTENT_WINDOW: Duration = Duration::from_secs(60);

/// Admission policy: at most `max_requests` per `window`.
///
/// Both values are validated on construction, so a policy in hand is
/// always usable by the limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    max_requests: u32,
    window: Duration,
}

impl RateLimitPolicy {
    /// Create a policy, rejecting a zero request count or a window
    /// shorter than one millisecond.
    pub fn new(max_requests: u32, window: Duration) -> Result<Self> {
        if max_requests == 0 {
            return Err(GatewayError::RateLimit(
                "max_requests must be greater than zero".to_string(),
            ));
        }
        if window.as_millis() == 0 {
            return Err(GatewayError::RateLimit(
                "window must be at least one millisecond".to_string(),
            ));
        }
        Ok(Self {
            max_requests,
            window,
        })
    }

    /// The policy guarding payment-intent creation.
    pub fn payment_intent() -> Self {
        Self {
            max_requests: PAYMENT_INTENT_MAX_REQUESTS,
            window: PAYMENT_INTENT_WINDOW,
        }
    }

    /// Maximum requests admitted per window.
    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Window length.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Window length in milliseconds, saturating at `i64::MAX`.
    pub fn window_millis(&self) -> i64 {
        i64::try_from(self.window.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Request count for one key within its current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRecord {
    /// Requests admitted in the current window
    pub count: u32,
    /// When the current window ends, in epoch milliseconds
    pub window_reset_at: i64,
}

impl RateLimitRecord {
    /// Open a new window at `now` with the opening request counted.
    pub fn open(now: i64, policy: &RateLimitPolicy) -> Self {
        Self {
            count: 1,
            window_reset_at: now.saturating_add(policy.window_millis()),
        }
    }

    /// Whether the window ended strictly before `now`.
    pub fn is_expired(&self, now: i64) -> bool {
        self.window_reset_at < now
    }

    /// Whether the window has admitted its full quota.
    pub fn is_exhausted(&self, policy: &RateLimitPolicy) -> bool {
        self.count >= policy.max_requests
    }

    /// Requests still admissible in this window.
    pub fn remaining(&self, policy: &RateLimitPolicy) -> u32 {
        policy.max_requests.saturating_sub(self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_rejects_zero_requests() {
        let err = RateLimitPolicy::new(0, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, GatewayError::RateLimit(_)));
    }

    #[test]
    fn test_policy_rejects_sub_millisecond_window() {
        assert!(RateLimitPolicy::new(5, Duration::ZERO).is_err());
        assert!(RateLimitPolicy::new(5, Duration::from_micros(999)).is_err());
        assert!(RateLimitPolicy::new(5, Duration::from_millis(1)).is_ok());
    }

    #[test]
    fn test_payment_intent_policy() {
        let policy = RateLimitPolicy::payment_intent();
        assert_eq!(policy.max_requests(), 5);
        assert_eq!(policy.window_millis(), 60_000);
    }

    #[test]
    fn test_record_opens_with_one_request() {
        let policy = RateLimitPolicy::new(3, Duration::from_millis(500)).unwrap();
        let record = RateLimitRecord::open(10_000, &policy);

        assert_eq!(record.count, 1);
        assert_eq!(record.window_reset_at, 10_500);
        assert_eq!(record.remaining(&policy), 2);
        assert!(!record.is_exhausted(&policy));
    }

    #[test]
    fn test_record_expiry_is_strict() {
        let policy = RateLimitPolicy::new(3, Duration::from_millis(500)).unwrap();
        let record = RateLimitRecord::open(0, &policy);

        assert!(!record.is_expired(499));
        assert!(!record.is_expired(500));
        assert!(record.is_expired(501));
    }
}
