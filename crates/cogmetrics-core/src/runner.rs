//! Simulation loop runner.
//!
//! This module provides [`run_simulation`], the async loop used when the
//! run is watched live, and [`run_to_completion`], its synchronous
//! headless counterpart. Both pull exactly one record at a time from the
//! [`SimulationClock`] and hand it to a [`RecordCallback`].
//!
//! Cancellation is cooperative: dropping the [`run_simulation`] future
//! between steps leaves the clock's history at the last completed step,
//! and [`SimulationResult::from_history`] reconstructs the outcome.

use std::time::Duration;

use cogmetrics_types::{MetricRecord, MetricSummary, RunStatus};
use tracing::{info, warn};

use crate::clock::{ClockError, SimulationClock};
use crate::history::HistoryStore;
use crate::views;

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A step failed.
    #[error("step error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },
}

/// Result of a simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    /// How the run ended.
    pub status: RunStatus,
    /// Total number of steps recorded.
    pub total_steps: u64,
    /// The last record, if any step completed.
    pub final_record: Option<MetricRecord>,
    /// Per-metric reduction over the whole history.
    pub summary: Option<MetricSummary>,
}

impl SimulationResult {
    /// Build a result from whatever history has been recorded.
    pub fn from_history(history: &HistoryStore, status: RunStatus) -> Self {
        Self {
            status,
            total_steps: u64::try_from(history.len()).unwrap_or(u64::MAX),
            final_record: history.latest().cloned(),
            summary: views::summarize(history.as_slice()),
        }
    }
}

/// Callback invoked after each recorded step.
///
/// Implementations can use this to update an observer snapshot, broadcast
/// records, print progress, etc.
pub trait RecordCallback: Send {
    /// Called after a step completes successfully.
    fn on_record(&mut self, record: &MetricRecord, history: &HistoryStore);

    /// Called once after the final step of a run that was not cancelled.
    fn on_finish(&mut self, _result: &SimulationResult) {}
}

/// A no-op record callback.
pub struct NoOpCallback;

impl RecordCallback for NoOpCallback {
    fn on_record(&mut self, _record: &MetricRecord, _history: &HistoryStore) {}
}

/// Run `steps` more steps, sleeping `interval` between them.
///
/// A zero interval still yields to the runtime after every step so that
/// observers sharing the runtime stay responsive.
pub async fn run_simulation(
    clock: &mut SimulationClock,
    steps: u64,
    interval: Duration,
    callback: &mut dyn RecordCallback,
) -> Result<SimulationResult, RunnerError> {
    info!(
        steps,
        interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
        seed = clock.seed(),
        "Simulation starting"
    );

    for _ in 0..steps {
        let record = clock.step()?;
        callback.on_record(&record, clock.history());

        if interval.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(interval).await;
        }
    }

    let result = SimulationResult::from_history(clock.history(), RunStatus::Completed);
    callback.on_finish(&result);
    Ok(result)
}

/// Run `steps` more steps back to back without yielding.
pub fn run_to_completion(
    clock: &mut SimulationClock,
    steps: u64,
    callback: &mut dyn RecordCallback,
) -> Result<SimulationResult, RunnerError> {
    info!(steps, seed = clock.seed(), "Headless simulation starting");

    for _ in 0..steps {
        let record = clock.step()?;
        callback.on_record(&record, clock.history());
    }

    let result = SimulationResult::from_history(clock.history(), RunStatus::Completed);
    callback.on_finish(&result);
    Ok(result)
}

/// Log the simulation end sequence.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        status = ?result.status,
        total_steps = result.total_steps,
        final_step = result.final_record.as_ref().map(|r| r.step),
        "Simulation ended"
    );

    if let Some(ref record) = result.final_record {
        info!(
            step = record.step,
            logic = record.logic,
            aesthetic = record.aesthetic,
            understanding = record.understanding,
            utility = record.utility,
            "Final record"
        );
    } else {
        warn!("Simulation ended with no steps executed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;

    fn make_clock() -> SimulationClock {
        SimulationClock::new(&SimulationConfig::default()).unwrap()
    }

    struct Counting {
        records: u64,
        last_history_len: usize,
        finished: bool,
    }

    impl RecordCallback for Counting {
        fn on_record(&mut self, record: &MetricRecord, history: &HistoryStore) {
            assert_eq!(usize::try_from(record.step).unwrap() + 1, history.len());
            self.records += 1;
            self.last_history_len = history.len();
        }

        fn on_finish(&mut self, _result: &SimulationResult) {
            self.finished = true;
        }
    }

    #[tokio::test]
    async fn runs_requested_steps() {
        let mut clock = make_clock();
        let result = run_simulation(&mut clock, 30, Duration::ZERO, &mut NoOpCallback)
            .await
            .unwrap();
        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.total_steps, 30);
        assert_eq!(result.final_record.unwrap().step, 29);
        assert_eq!(result.summary.unwrap().steps, 30);
    }

    #[tokio::test]
    async fn callback_sees_every_record() {
        let mut clock = make_clock();
        let mut callback = Counting {
            records: 0,
            last_history_len: 0,
            finished: false,
        };
        run_simulation(&mut clock, 12, Duration::ZERO, &mut callback)
            .await
            .unwrap();
        assert_eq!(callback.records, 12);
        assert_eq!(callback.last_history_len, 12);
        assert!(callback.finished);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_paces_the_run() {
        let mut clock = make_clock();
        let started = tokio::time::Instant::now();
        run_simulation(&mut clock, 5, Duration::from_millis(100), &mut NoOpCallback)
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_run_keeps_completed_steps() {
        let mut clock = make_clock();
        let outcome = tokio::time::timeout(
            Duration::from_millis(350),
            run_simulation(&mut clock, 100, Duration::from_millis(100), &mut NoOpCallback),
        )
        .await;
        assert!(outcome.is_err());

        let steps = clock.history().len();
        assert!(steps > 0 && steps < 100);
        let result = SimulationResult::from_history(clock.history(), RunStatus::Cancelled);
        assert_eq!(result.status, RunStatus::Cancelled);
        assert_eq!(result.total_steps, u64::try_from(steps).unwrap());
    }

    #[test]
    fn headless_matches_async_run() {
        let mut headless = make_clock();
        let a = run_to_completion(&mut headless, 150, &mut NoOpCallback).unwrap();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let mut paced = make_clock();
        let b = runtime
            .block_on(run_simulation(&mut paced, 150, Duration::ZERO, &mut NoOpCallback))
            .unwrap();

        assert_eq!(a.final_record, b.final_record);
        assert_eq!(a.summary, b.summary);
    }

    #[test]
    fn empty_history_result() {
        let clock = make_clock();
        let result = SimulationResult::from_history(clock.history(), RunStatus::Cancelled);
        assert_eq!(result.total_steps, 0);
        assert!(result.final_record.is_none());
        assert!(result.summary.is_none());
        log_simulation_end(&result);
    }
}
