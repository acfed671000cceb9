//! Shared application state for the Observer API server.
//!
//! [`AppState`] holds the broadcast channel for per-step record summaries
//! and an in-memory [`ObserverSnapshot`] of the run that the REST
//! endpoints serve.

use std::sync::Arc;

use cogmetrics_types::{MetricRecord, RunInfo, RunStatus, TokenId};
use tokio::sync::{broadcast, RwLock};

/// Capacity of the broadcast channel for record summaries.
///
/// If a subscriber falls behind by more than this many messages it will
/// receive a [`broadcast::error::RecvError::Lagged`] and skip to the
/// newest message.
const BROADCAST_CAPACITY: usize = 256;

/// JSON-serializable record summary pushed over the `WebSocket`.
///
/// This is a lightweight projection of [`MetricRecord`] without the
/// probability snapshot, which does not change between steps.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RecordBroadcast {
    /// The step index.
    pub step: u64,
    /// The token drawn at this step.
    pub token: TokenId,
    /// Logic score.
    pub logic: f64,
    /// Aesthetic score.
    pub aesthetic: f64,
    /// Understanding score.
    pub understanding: f64,
    /// Utility score.
    pub utility: f64,
}

impl From<&MetricRecord> for RecordBroadcast {
    fn from(record: &MetricRecord) -> Self {
        Self {
            step: record.step,
            token: record.token,
            logic: record.logic,
            aesthetic: record.aesthetic,
            understanding: record.understanding,
            utility: record.utility,
        }
    }
}

/// In-memory copy of the run served by REST endpoints.
#[derive(Debug, Clone, Default)]
pub struct ObserverSnapshot {
    /// Identity and parameters of the run, once it has started.
    pub run: Option<RunInfo>,
    /// Lifecycle status of the run.
    pub status: RunStatus,
    /// Probability mass per token.
    pub probabilities: Vec<f64>,
    /// Every record mirrored so far, in step order.
    pub records: Vec<MetricRecord>,
}

impl ObserverSnapshot {
    /// Append the records of `history` this snapshot has not seen yet.
    ///
    /// Returns the number of records appended.
    pub fn catch_up(&mut self, history: &[MetricRecord]) -> usize {
        let missing = history.get(self.records.len()..).unwrap_or_default();
        self.records.extend_from_slice(missing);
        missing.len()
    }
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Broadcast sender for record summary messages.
    pub tx: broadcast::Sender<RecordBroadcast>,
    /// The mirrored run (updated each step).
    pub snapshot: Arc<RwLock<ObserverSnapshot>>,
}

impl AppState {
    /// Create a new application state with an empty snapshot.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            tx,
            snapshot: Arc::new(RwLock::new(ObserverSnapshot::default())),
        }
    }

    /// Record that a run has started with the given parameters and
    /// probability table. Clears any previously mirrored records.
    pub async fn begin_run(&self, run: RunInfo, probabilities: Vec<f64>) {
        let mut snapshot = self.snapshot.write().await;
        *snapshot = ObserverSnapshot {
            run: Some(run),
            status: RunStatus::Running,
            probabilities,
            records: Vec::new(),
        };
    }

    /// Bring the snapshot fully up to date and set the run status.
    pub async fn finish_run(&self, history: &[MetricRecord], status: RunStatus) {
        let mut snapshot = self.snapshot.write().await;
        snapshot.catch_up(history);
        snapshot.status = status;
    }

    /// Mirror new records without waiting for the lock.
    ///
    /// Returns `false` if a reader currently holds the lock; the missing
    /// records are picked up by the next successful call.
    pub fn try_sync(&self, history: &[MetricRecord]) -> bool {
        self.snapshot.try_write().is_ok_and(|mut snapshot| {
            snapshot.catch_up(history);
            true
        })
    }

    /// Subscribe to the record broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<RecordBroadcast> {
        self.tx.subscribe()
    }

    /// Publish a record summary to all connected clients.
    ///
    /// Returns the number of receivers that received the message.
    /// Returns 0 if no clients are connected (this is not an error).
    pub fn broadcast(&self, record: &MetricRecord) -> usize {
        self.tx.send(RecordBroadcast::from(record)).unwrap_or(0)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cogmetrics_core::clock::SimulationClock;
    use cogmetrics_core::config::SimulationConfig;

    use super::*;

    fn clock_with_steps(steps: u64) -> SimulationClock {
        let mut clock = SimulationClock::new(&SimulationConfig::default()).unwrap();
        for record in clock.run_steps(steps) {
            record.unwrap();
        }
        clock
    }

    #[test]
    fn catch_up_appends_only_missing_records() {
        let clock = clock_with_steps(10);
        let history = clock.history().as_slice();
        let mut snapshot = ObserverSnapshot::default();

        assert_eq!(snapshot.catch_up(history.get(..4).unwrap()), 4);
        assert_eq!(snapshot.catch_up(history), 6);
        assert_eq!(snapshot.catch_up(history), 0);
        assert_eq!(snapshot.records.as_slice(), history);
    }

    #[tokio::test]
    async fn try_sync_fails_while_read_locked() {
        let clock = clock_with_steps(3);
        let state = AppState::new();
        {
            let _guard = state.snapshot.read().await;
            assert!(!state.try_sync(clock.history().as_slice()));
        }
        assert!(state.try_sync(clock.history().as_slice()));
        assert_eq!(state.snapshot.read().await.records.len(), 3);
    }

    #[tokio::test]
    async fn broadcast_reaches_subscribers() {
        let clock = clock_with_steps(1);
        let state = AppState::new();
        let record = clock.history().latest().unwrap();
        assert_eq!(state.broadcast(record), 0);

        let mut rx = state.subscribe();
        assert_eq!(state.broadcast(record), 1);
        let received = rx.recv().await.unwrap();
        assert_eq!(received, RecordBroadcast::from(record));
    }

    #[tokio::test]
    async fn run_lifecycle_updates_status() {
        let clock = clock_with_steps(5);
        let state = AppState::new();
        state
            .begin_run(clock.run_info().clone(), clock.table().snapshot())
            .await;
        assert_eq!(state.snapshot.read().await.status, RunStatus::Running);

        state
            .finish_run(clock.history().as_slice(), RunStatus::Completed)
            .await;
        let snapshot = state.snapshot.read().await;
        assert_eq!(snapshot.status, RunStatus::Completed);
        assert_eq!(snapshot.records.len(), 5);
        assert_eq!(snapshot.probabilities.len(), 10);
    }
}
