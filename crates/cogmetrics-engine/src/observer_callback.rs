//! Record callback that updates the Observer API state.
//!
//! After each step, this callback mirrors new records into the
//! [`ObserverSnapshot`](cogmetrics_observer::state::ObserverSnapshot) and
//! broadcasts a summary to all connected `WebSocket` clients.

use std::sync::Arc;

use cogmetrics_core::history::HistoryStore;
use cogmetrics_core::runner::RecordCallback;
use cogmetrics_observer::state::AppState;
use cogmetrics_types::MetricRecord;
use tracing::debug;

/// Callback that bridges the step loop to the Observer API.
pub struct ObserverCallback {
    state: Arc<AppState>,
    skipped_syncs: u64,
}

impl ObserverCallback {
    /// Create a new observer callback backed by the given app state.
    pub const fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            skipped_syncs: 0,
        }
    }

    /// Number of steps whose snapshot update was deferred because a
    /// reader held the lock.
    pub const fn skipped_syncs(&self) -> u64 {
        self.skipped_syncs
    }
}

impl RecordCallback for ObserverCallback {
    fn on_record(&mut self, record: &MetricRecord, history: &HistoryStore) {
        let receivers = self.state.broadcast(record);
        debug!(step = record.step, receivers, "Record broadcast sent");

        // A REST handler holding the read lock defers the update; the next
        // step catches up from history.
        if !self.state.try_sync(history.as_slice()) {
            self.skipped_syncs = self.skipped_syncs.saturating_add(1);
            debug!(step = record.step, "Snapshot busy, deferring sync");
        }
    }
}
