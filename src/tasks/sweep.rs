//! Rate Limit Sweep Task
//!
//! Bounds rate limiter memory by dropping client buckets idle for over an hour.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::api::ClientRateLimiter;

/// How often idle buckets are swept.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Spawns a task that sweeps idle buckets every `interval`.
pub fn spawn_rate_limit_sweep(limiter: ClientRateLimiter, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;

            let removed = limiter.sweep_idle();
            debug!(
                removed,
                remaining = limiter.tracked_clients(),
                "Rate limit sweep finished"
            );
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroU32;

    #[tokio::test]
    async fn test_sweep_keeps_recent_clients() {
        let limiter = ClientRateLimiter::new(NonZeroU32::new(10).unwrap());
        limiter.check("10.0.0.1");

        let handle = spawn_rate_limit_sweep(limiter.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(limiter.tracked_clients(), 1);
        handle.abort();
    }
}
