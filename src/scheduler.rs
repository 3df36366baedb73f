//! Fixed-interval cycle driver

use crate::error::SchedulerError;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Aborts the wrapped run when the scheduler loop itself is dropped
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Runs a unit of work every `interval`, forever
///
/// The first run happens immediately. Runs never overlap: the next tick is
/// awaited only after the previous run finished, and ticks missed while a
/// run overran are skipped rather than replayed.
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    interval: Duration,
}

impl Scheduler {
    /// Creates a scheduler with the given period
    pub fn every(interval: Duration) -> Result<Self, SchedulerError> {
        if interval.is_zero() {
            return Err(SchedulerError::ZeroInterval);
        }
        Ok(Self { interval })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawns the loop and returns without blocking
    ///
    /// Each run executes in its own task so a panic ends only that run.
    /// Aborting the returned handle also aborts the run in flight.
    pub fn start<F, Fut>(self, mut task: F) -> JoinHandle<()>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(async move {
            tracing::info!(
                interval_secs = self.interval.as_secs_f64(),
                "Starting scheduler"
            );

            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let mut run = AbortOnDrop(tokio::spawn(task()));
                if let Err(e) = (&mut run.0).await {
                    tracing::error!(error = %e, "Scheduled run aborted");
                }
            }
        })
    }
}
