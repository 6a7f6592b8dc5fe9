//! Background removal of expired rate limit records.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::limiter::RateLimiter;

/// Default interval between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);
/// Shortest interval the sweeper will run at.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Owner of a running sweep task.
///
/// The task stops when the handle is dropped or [`shutdown`](Self::shutdown)
/// is awaited. It also stops on its own once the limiter is gone.
#[derive(Debug)]
pub struct SweeperHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Stop the sweep task and wait for it to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    /// Whether the sweep task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl RateLimiter {
    /// Start sweeping expired records every `interval` on the current
    /// tokio runtime.
    ///
    /// The first sweep happens one full interval after the call. Intervals
    /// below [`MIN_SWEEP_INTERVAL`] are raised to it.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> SweeperHandle {
        let interval = if interval < MIN_SWEEP_INTERVAL {
            warn!(
                requested_ms = interval.as_millis() as u64,
                "Sweep interval too short, using minimum"
            );
            MIN_SWEEP_INTERVAL
        } else {
            interval
        };
        let cancel = CancellationToken::new();
        let task = tokio::spawn(sweep_loop(Arc::downgrade(self), interval, cancel.clone()));

        info!(interval_ms = interval.as_millis() as u64, "Rate limit sweeper started");

        SweeperHandle {
            cancel,
            task: Some(task),
        }
    }
}

async fn sweep_loop(limiter: Weak<RateLimiter>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let Some(limiter) = limiter.upgrade() else {
                    break;
                };
                let removed = limiter.sweep();
                if removed > 0 {
                    debug!(
                        removed = removed,
                        remaining = limiter.record_count(),
                        "Swept expired rate limit records"
                    );
                }
            }
        }
    }

    debug!("Rate limit sweeper stopped");
}
