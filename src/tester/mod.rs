//! Connection test orchestration
//!
//! A run moves through three phases:
//! - **Running**: the [`Scheduler`] spawns one [`AttemptWorker`] task now and
//!   one per period until the attempt count is reached or the run is cancelled
//! - **Draining**: nothing new is spawned and every spawned worker is joined
//! - **Terminal**: the verdict is computed from the success counter
//!
//! The counter is only read after the join barrier, so no attempt can still
//! be incrementing it when the rate is computed.

pub mod accumulator;
pub mod attempt;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod test_support;

pub use accumulator::{meets_threshold, success_rate, SuccessCounter};
pub use attempt::{
    AttemptError, AttemptOutcome, AttemptStage, AttemptWorker, Connection, Dialer, NetDialer,
};
pub use scheduler::{Schedule, Scheduler, StopReason};

use crate::{
    error::{AppError, Result},
    logging::Logger,
    models::{Config, TestConfiguration},
};
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Terminal outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    /// The success rate met the threshold
    Passed,
    /// The success rate (floored percentage) stayed below the threshold
    Failed { rate: u32 },
    /// Cancellation was observed before every attempt was scheduled
    Cancelled,
}

impl Verdict {
    pub fn is_passed(&self) -> bool {
        matches!(self, Verdict::Passed)
    }

    /// Process exit status for this verdict
    pub fn exit_code(&self) -> i32 {
        match self {
            Verdict::Passed => 0,
            Verdict::Failed { .. } => 2,
            Verdict::Cancelled => 3,
        }
    }
}

/// Lifecycle phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum RunPhase {
    Running,
    Draining,
    Terminal,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Running => "running",
            RunPhase::Draining => "draining",
            RunPhase::Terminal => "terminal",
        }
    }
}

/// Result delivered to the caller once per run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub verdict: Verdict,
    /// Attempts spawned before scheduling stopped
    pub attempts_spawned: u32,
    /// Successful attempts among those spawned
    pub successes: u64,
    /// Floored success percentage; `None` when the run was cancelled
    pub rate: Option<u32>,
    pub threshold: u32,
}

impl RunSummary {
    /// Collapse the summary into the crate error type for the binary's exit path
    pub fn into_result(self) -> Result<()> {
        match self.verdict {
            Verdict::Passed => Ok(()),
            Verdict::Failed { rate } => Err(AppError::test_failed(rate, self.threshold)),
            Verdict::Cancelled => Err(AppError::cancelled(format!(
                "stopped after {} scheduled attempt(s)",
                self.attempts_spawned
            ))),
        }
    }
}

/// Per-run bookkeeping; created when a run starts and dropped when it ends
struct RunState {
    phase: RunPhase,
    scheduled: u32,
    counter: SuccessCounter,
}

impl RunState {
    fn new() -> Self {
        Self {
            phase: RunPhase::Running,
            scheduled: 0,
            counter: SuccessCounter::new(),
        }
    }

    async fn enter(&mut self, next: RunPhase, logger: &Logger) {
        debug_assert!(next > self.phase, "run phases only move forward");
        logger.debug("run phase changed")
            .field("from", self.phase.as_str())
            .field("to", next.as_str())
            .log()
            .await;
        self.phase = next;
    }
}

/// Runs one connection test against the configured endpoint
pub struct ConnTester {
    config: Arc<TestConfiguration>,
    logger: Logger,
    dialer: Arc<dyn Dialer>,
}

impl ConnTester {
    /// Create a tester using the real network stack
    pub fn new(config: TestConfiguration, logger: Logger) -> Self {
        Self {
            config: Arc::new(config),
            logger,
            dialer: Arc::new(NetDialer),
        }
    }

    /// Validate `config` and create a tester from it
    pub fn from_config(config: &Config, logger: Logger) -> Result<Self> {
        Ok(Self::new(TestConfiguration::from_config(config)?, logger))
    }

    /// Replace the transport used to open connections
    pub fn with_dialer(mut self, dialer: Arc<dyn Dialer>) -> Self {
        self.dialer = dialer;
        self
    }

    pub fn config(&self) -> &TestConfiguration {
        &self.config
    }

    /// Run the test on a background task
    pub fn spawn(self, cancel: CancellationToken) -> RunHandle {
        RunHandle {
            task: tokio::spawn(self.run(cancel)),
        }
    }

    /// Run the test to completion.
    ///
    /// Cancellation stops new attempts from being scheduled; attempts already
    /// in flight still run until their own timeout.
    pub async fn run(self, cancel: CancellationToken) -> RunSummary {
        let mut state = RunState::new();
        let config = &self.config;

        self.logger.info("starting connection test")
            .field("protocol", config.protocol())
            .field("endpoint", config.endpoint().to_string())
            .field("attempts", config.attempts())
            .field("timeout_ms", config.timeout().as_millis() as u64)
            .field("period_ms", config.period().as_millis() as u64)
            .field("success_threshold", config.success_threshold())
            .field("message_bytes", config.message().len())
            .log()
            .await;

        let worker = AttemptWorker::new(
            self.config.clone(),
            self.dialer.clone(),
            state.counter.clone(),
            self.logger.named("attempt"),
        );
        let scheduler = Scheduler::new(
            config.attempts(),
            config.period(),
            worker,
            self.logger.named("scheduler"),
        );
        let Schedule { mut workers, spawned, stop } = scheduler.run(&cancel).await;
        state.scheduled = spawned;

        state.enter(RunPhase::Draining, &self.logger).await;
        self.logger.info("waiting for connections to stop...")
            .field("in_flight", workers.len())
            .log()
            .await;
        while let Some(joined) = workers.join_next().await {
            if let Err(error) = joined {
                // A worker that died never reached the counter
                self.logger.error("attempt task failed")
                    .error_info(&AppError::from(error))
                    .log()
                    .await;
            }
        }
        self.logger.info("all connections have finished").log().await;

        state.enter(RunPhase::Terminal, &self.logger).await;
        let successes = state.counter.get().await;
        let threshold = config.success_threshold();

        if stop == StopReason::Cancelled {
            self.logger.info("exiting because of cancellation")
                .field("scheduled", state.scheduled)
                .field("successes", successes)
                .log()
                .await;
            return RunSummary {
                verdict: Verdict::Cancelled,
                attempts_spawned: state.scheduled,
                successes,
                rate: None,
                threshold,
            };
        }

        let rate = success_rate(successes, config.attempts());
        self.logger.info(&format!("success rate of: {}", rate))
            .field("successes", successes)
            .field("attempts", config.attempts())
            .log()
            .await;

        let verdict = if meets_threshold(rate, threshold) {
            self.logger.info(&format!("success rate meets threshold: {}", threshold)).log().await;
            Verdict::Passed
        } else {
            self.logger.info(&format!("success rate lower than threshold: {}", threshold)).log().await;
            Verdict::Failed { rate }
        };

        RunSummary {
            verdict,
            attempts_spawned: state.scheduled,
            successes,
            rate: Some(rate),
            threshold,
        }
    }
}

/// Handle to a run started with [`ConnTester::spawn`]; yields its summary once
pub struct RunHandle {
    task: JoinHandle<RunSummary>,
}

impl RunHandle {
    /// Wait for the run to reach its terminal phase
    pub async fn wait(self) -> Result<RunSummary> {
        Ok(self.task.await?)
    }
}
