//! Spawns attempts on a fixed period until the count is reached or the run is cancelled

use crate::{
    logging::Logger,
    tester::attempt::{AttemptOutcome, AttemptWorker},
};
use std::time::Duration;
use tokio::{
    task::JoinSet,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

/// Why the scheduler stopped spawning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every configured attempt was spawned
    Exhausted,
    /// Cancellation was observed first
    Cancelled,
}

/// What the scheduler hands back: the in-flight workers and why it stopped
pub struct Schedule {
    pub workers: JoinSet<AttemptOutcome>,
    pub spawned: u32,
    pub stop: StopReason,
}

pub struct Scheduler {
    attempts: u32,
    period: Duration,
    worker: AttemptWorker,
    logger: Logger,
}

impl Scheduler {
    pub fn new(attempts: u32, period: Duration, worker: AttemptWorker, logger: Logger) -> Self {
        Self { attempts, period, worker, logger }
    }

    /// Spawn attempt #1 right away, then one more per period.
    ///
    /// Returns as soon as spawning stops; attempts that are still running are
    /// owned by the returned [`JoinSet`] and must be drained by the caller.
    pub async fn run(self, cancel: &CancellationToken) -> Schedule {
        let mut workers = JoinSet::new();
        let mut spawned = 0u32;

        self.spawn_next(&mut workers, &mut spawned).await;

        let stop = if self.period.is_zero() {
            self.spawn_back_to_back(&mut workers, &mut spawned, cancel).await
        } else {
            self.spawn_on_ticks(&mut workers, &mut spawned, cancel).await
        };

        match stop {
            StopReason::Exhausted => {
                self.logger.info("done creating connections")
                    .field("spawned", spawned)
                    .log()
                    .await;
            }
            StopReason::Cancelled => {
                self.logger.info("stopped creating connections because of cancellation")
                    .field("spawned", spawned)
                    .field("attempts", self.attempts)
                    .log()
                    .await;
            }
        }

        Schedule { workers, spawned, stop }
    }

    async fn spawn_on_ticks(
        &self,
        workers: &mut JoinSet<AttemptOutcome>,
        spawned: &mut u32,
        cancel: &CancellationToken,
    ) -> StopReason {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while *spawned < self.attempts {
            tokio::select! {
                // Cancellation wins over a tick that is ready at the same time
                biased;
                _ = cancel.cancelled() => return StopReason::Cancelled,
                _ = ticker.tick() => self.spawn_next(workers, spawned).await,
            }
        }
        StopReason::Exhausted
    }

    async fn spawn_back_to_back(
        &self,
        workers: &mut JoinSet<AttemptOutcome>,
        spawned: &mut u32,
        cancel: &CancellationToken,
    ) -> StopReason {
        while *spawned < self.attempts {
            // Give the signal bridge a chance to run between spawns
            tokio::task::yield_now().await;
            if cancel.is_cancelled() {
                return StopReason::Cancelled;
            }
            self.spawn_next(workers, spawned).await;
        }
        StopReason::Exhausted
    }

    async fn spawn_next(&self, workers: &mut JoinSet<AttemptOutcome>, spawned: &mut u32) {
        *spawned += 1;
        let sequence = *spawned;
        workers.spawn(self.worker.clone().run(sequence));

        self.logger.debug("attempt scheduled")
            .field("attempt", sequence)
            .field("of", self.attempts)
            .log()
            .await;
    }
}
