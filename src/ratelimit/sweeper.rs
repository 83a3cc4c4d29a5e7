//! Background eviction of expired client windows.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::limiter::RateLimiter;

/// Handle to a running sweeper task.
pub struct SweeperHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        let _ = self.task.await;
    }
}

/// Shortest interval the sweeper will run at.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Spawn a task that sweeps `limiter` every `interval`.
///
/// The first sweep happens one full interval after spawning. Intervals
/// shorter than one millisecond, including zero, are raised to one.
pub fn spawn_sweeper(limiter: Arc<RateLimiter>, interval: Duration) -> SweeperHandle {
    let interval = interval.max(MIN_SWEEP_INTERVAL);
    let (shutdown, mut stop) = oneshot::channel();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval = ?interval, "Rate limit sweeper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = limiter.sweep();
                    debug!(
                        removed = removed,
                        remaining = limiter.window_count(),
                        "Swept expired rate limit windows"
                    );
                }
                _ = &mut stop => break,
            }
        }

        info!("Rate limit sweeper stopped");
    });

    SweeperHandle { shutdown, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::ManualClock;

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_on_interval() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = Arc::new(RateLimiter::with_clock(clock.clone()));
        let sweeper = spawn_sweeper(limiter.clone(), Duration::from_secs(600));

        limiter.check_rate_limit("expiring", 3, Duration::from_secs(60));
        limiter.check_rate_limit("lasting", 3, Duration::from_secs(3600));
        clock.advance(Duration::from_secs(61));

        // Before the first tick nothing is removed.
        tokio::time::sleep(Duration::from_secs(599)).await;
        assert_eq!(limiter.window_count(), 2);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(limiter.window_count(), 1);
        assert!(limiter.window("lasting").is_some());

        sweeper.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_stops_on_shutdown() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = Arc::new(RateLimiter::with_clock(clock.clone()));
        let sweeper = spawn_sweeper(limiter.clone(), Duration::from_secs(1));

        sweeper.shutdown().await;

        limiter.check_rate_limit("client", 3, Duration::from_millis(10));
        clock.advance(Duration::from_secs(1));
        tokio::time::sleep(Duration::from_secs(5)).await;

        // Nobody is sweeping any more.
        assert_eq!(limiter.window_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_still_sweeps() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = Arc::new(RateLimiter::with_clock(clock.clone()));
        let sweeper = spawn_sweeper(limiter.clone(), Duration::ZERO);

        limiter.check_rate_limit("client", 3, Duration::from_millis(10));
        clock.advance(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(limiter.window_count(), 0);
        assert!(!sweeper.task.is_finished());
        sweeper.shutdown().await;
    }
}
