//! Rate limiting logic and state management.

mod client_key;
mod clock;
mod counter;
mod limiter;
mod sweeper;

pub use client_key::{ClientKey, CF_CONNECTING_IP, FORWARDED_FOR, REAL_IP, UNKNOWN};
pub use clock::{Clock, ManualClock, SystemClock};
pub use counter::{
    RateLimitPolicy, RateLimitRecord, PAYMENT_INTENT_MAX_REQUESTS, PAYMENT_INTENT_WINDOW,
};
pub use limiter::{RateLimitDecision, RateLimiter};
pub use sweeper::{SweeperHandle, DEFAULT_SWEEP_INTERVAL};
