//! Core rate limiter implementation.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, trace};

use super::clock::{Clock, SystemClock};
use super::counter::{RateLimitPolicy, RateLimitRecord};

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request is admitted
    pub allowed: bool,
    /// Requests still admissible in the current window
    pub remaining: u32,
    /// When the current window ends, in epoch milliseconds
    pub reset_at: i64,
}

/// Fixed-window request counter keyed by client identity.
///
/// A window opens on the first request for a key and lasts for the
/// policy's window length; the first request after it ends opens the next
/// one. Because windows are anchored to first use, a caller can be
/// admitted up to twice the limit across two adjacent windows.
///
/// The limiter is thread-safe and meant to be shared behind an `Arc`.
pub struct RateLimiter {
    /// Window records indexed by client key
    records: DashMap<String, RateLimitRecord>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a rate limiter backed by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a rate limiter reading time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: DashMap::new(),
            clock,
        }
    }

    /// Decide whether a request for `key` is admitted under `policy`.
    ///
    /// The entry stays locked for the whole read-modify-write, so
    /// concurrent checks for one key admit at most `max_requests`.
    pub fn check(&self, key: &str, policy: &RateLimitPolicy) -> RateLimitDecision {
        let now = self.clock.now_millis();

        trace!(key = %key, max_requests = policy.max_requests(), "Checking rate limit");

        match self.records.entry(key.to_string()) {
            Entry::Vacant(vacant) => {
                let record = RateLimitRecord::open(now, policy);
                debug!(key = %key, reset_at = record.window_reset_at, "Opening rate limit window");
                vacant.insert(record);
                Self::admitted(&record, policy)
            }
            Entry::Occupied(mut occupied) => {
                let record = occupied.get_mut();

                if record.is_expired(now) {
                    *record = RateLimitRecord::open(now, policy);
                    debug!(key = %key, reset_at = record.window_reset_at, "Opening rate limit window");
                    return Self::admitted(record, policy);
                }

                if record.is_exhausted(policy) {
                    debug!(
                        key = %key,
                        count = record.count,
                        reset_at = record.window_reset_at,
                        "Rate limit exceeded"
                    );
                    return RateLimitDecision {
                        allowed: false,
                        remaining: 0,
                        reset_at: record.window_reset_at,
                    };
                }

                record.count += 1;
                Self::admitted(record, policy)
            }
        }
    }

    fn admitted(record: &RateLimitRecord, policy: &RateLimitPolicy) -> RateLimitDecision {
        RateLimitDecision {
            allowed: true,
            remaining: record.remaining(policy),
            reset_at: record.window_reset_at,
        }
    }

    /// Remove every record whose window has ended.
    ///
    /// Returns the number of records removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_millis();
        let before = self.records.len();
        self.records.retain(|_, record| !record.is_expired(now));
        before.saturating_sub(self.records.len())
    }

    /// Get a copy of the record for `key`, if one is tracked.
    pub fn record(&self, key: &str) -> Option<RateLimitRecord> {
        self.records.get(key).map(|record| *record)
    }

    /// Get the number of tracked records.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Clear all records.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.records.clear();
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::ManualClock;
    use std::time::Duration;

    const START: i64 = 1_700_000_000_000;

    fn limiter() -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(START));
        (RateLimiter::with_clock(clock.clone()), clock)
    }

    fn policy(max: u32, window_ms: u64) -> RateLimitPolicy {
        RateLimitPolicy::new(max, Duration::from_millis(window_ms)).unwrap()
    }

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = RateLimiter::new();
        assert_eq!(limiter.record_count(), 0);
    }

    #[test]
    fn test_first_call_opens_window() {
        let (limiter, _clock) = limiter();
        let policy = policy(10, 1_000);

        let decision = limiter.check("client", &policy);

        assert!(decision.allowed);
        assert_eq!(decision.remaining, 9);
        assert_eq!(decision.reset_at, START + 1_000);
        assert_eq!(
            limiter.record("client"),
            Some(RateLimitRecord {
                count: 1,
                window_reset_at: START + 1_000
            })
        );
    }

    #[test]
    fn test_remaining_counts_down_then_denies() {
        let (limiter, clock) = limiter();
        let policy = policy(4, 10_000);

        let first = limiter.check("k", &policy);
        let mut remaining = vec![first.remaining];
        for _ in 1..4 {
            clock.advance(Duration::from_millis(100));
            let decision = limiter.check("k", &policy);
            assert!(decision.allowed);
            assert_eq!(decision.reset_at, first.reset_at);
            remaining.push(decision.remaining);
        }
        assert_eq!(remaining, vec![3, 2, 1, 0]);

        let denied = limiter.check("k", &policy);
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.reset_at, first.reset_at);
    }

    #[test]
    fn test_denied_call_does_not_mutate_record() {
        let (limiter, _clock) = limiter();
        let policy = policy(2, 1_000);

        limiter.check("k", &policy);
        limiter.check("k", &policy);
        let before = limiter.record("k");

        for _ in 0..3 {
            assert!(!limiter.check("k", &policy).allowed);
        }

        assert_eq!(limiter.record("k"), before);
        assert_eq!(limiter.record("k").map(|r| r.count), Some(2));
    }

    #[test]
    fn test_payment_intent_scenario() {
        let (limiter, clock) = limiter();
        let policy = RateLimitPolicy::payment_intent();

        for expected in [4, 3, 2, 1, 0] {
            let decision = limiter.check("1.2.3.4", &policy);
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected);
        }

        let sixth = limiter.check("1.2.3.4", &policy);
        assert!(!sixth.allowed);
        assert_eq!(sixth.remaining, 0);

        clock.advance(Duration::from_millis(60_001));

        let seventh = limiter.check("1.2.3.4", &policy);
        assert!(seventh.allowed);
        assert_eq!(seventh.remaining, 4);
        assert_eq!(seventh.reset_at, START + 60_001 + 60_000);
    }

    #[test]
    fn test_window_still_applies_at_reset_instant() {
        let (limiter, clock) = limiter();
        let policy = policy(1, 1_000);

        limiter.check("k", &policy);
        clock.advance(Duration::from_millis(1_000));
        assert!(!limiter.check("k", &policy).allowed);

        clock.advance(Duration::from_millis(1));
        assert!(limiter.check("k", &policy).allowed);
    }

    #[test]
    fn test_new_window_resets_count_to_one() {
        let (limiter, clock) = limiter();
        let policy = policy(3, 1_000);

        limiter.check("k", &policy);
        limiter.check("k", &policy);
        clock.advance(Duration::from_millis(1_500));
        limiter.check("k", &policy);

        assert_eq!(
            limiter.record("k"),
            Some(RateLimitRecord {
                count: 1,
                window_reset_at: START + 1_500 + 1_000
            })
        );
    }

    #[test]
    fn test_different_keys_have_separate_records() {
        let (limiter, _clock) = limiter();
        let policy = policy(2, 1_000);

        limiter.check("a", &policy);
        limiter.check("a", &policy);
        assert!(!limiter.check("a", &policy).allowed);

        let other = limiter.check("b", &policy);
        assert!(other.allowed);
        assert_eq!(other.remaining, 1);
        assert_eq!(limiter.record_count(), 2);
    }

    #[test]
    fn test_burst_across_window_boundary() {
        let (limiter, clock) = limiter();
        let policy = policy(3, 1_000);

        clock.advance(Duration::from_millis(990));
        limiter.check("k", &policy);
        clock.advance(Duration::from_millis(1_000));
        for _ in 0..2 {
            assert!(limiter.check("k", &policy).allowed);
        }

        clock.advance(Duration::from_millis(11));
        let admitted = (0..3).filter(|_| limiter.check("k", &policy).allowed).count();
        assert_eq!(admitted, 3);
    }

    #[test]
    fn test_sweep_removes_only_expired_records() {
        let (limiter, clock) = limiter();
        let short = policy(5, 1_000);
        let long = policy(5, 600_000);

        limiter.check("short", &short);
        limiter.check("long", &long);
        clock.advance(Duration::from_millis(1_001));

        assert_eq!(limiter.sweep(), 1);
        assert!(limiter.record("short").is_none());
        assert!(limiter.record("long").is_some());
        assert_eq!(limiter.record_count(), 1);
    }

    #[test]
    fn test_sweep_keeps_record_at_reset_instant() {
        let (limiter, clock) = limiter();
        let policy = policy(5, 1_000);

        limiter.check("k", &policy);
        clock.advance(Duration::from_millis(1_000));

        assert_eq!(limiter.sweep(), 0);
        assert_eq!(limiter.record_count(), 1);
    }

    #[test]
    fn test_clear_records() {
        let (limiter, _clock) = limiter();
        limiter.check("k", &policy(5, 1_000));
        assert_eq!(limiter.record_count(), 1);

        limiter.clear();
        assert_eq!(limiter.record_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checks_admit_exactly_max() {
        let (limiter, _clock) = limiter();
        let limiter = Arc::new(limiter);
        let policy = policy(5, 60_000);

        let tasks = (0..64).map(|_| {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.check("1.2.3.4", &policy) })
        });
        let decisions = futures::future::join_all(tasks).await;

        let admitted = decisions
            .into_iter()
            .map(|joined| joined.unwrap())
            .filter(|decision| decision.allowed)
            .count();
        assert_eq!(admitted, 5);
        assert_eq!(limiter.record("1.2.3.4").map(|r| r.count), Some(5));
    }
}
