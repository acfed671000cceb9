//! Record, summary, and projection structs shared between the engine and
//! its consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{MetricKind, RunMode};
use crate::ids::{RunId, TokenId};

// ---------------------------------------------------------------------------
// Per-step values
// ---------------------------------------------------------------------------

/// The four emergent metric values computed at a single step.
///
/// Every field lies in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MetricValues {
    /// Fidelity-driven reasoning score.
    pub logic: f64,
    /// Entropy-driven diversity score.
    pub aesthetic: f64,
    /// Harmonic synthesis of logic and aesthetic.
    pub understanding: f64,
    /// Performance minus the entropy penalty.
    pub utility: f64,
}

impl MetricValues {
    /// Return the value for a single metric.
    pub const fn get(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::Logic => self.logic,
            MetricKind::Aesthetic => self.aesthetic,
            MetricKind::Understanding => self.understanding,
            MetricKind::Utility => self.utility,
        }
    }
}

/// One recorded simulation step. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MetricRecord {
    /// Zero-based step index; equals the record's position in history.
    pub step: u64,
    /// Fidelity-driven reasoning score.
    pub logic: f64,
    /// Entropy-driven diversity score.
    pub aesthetic: f64,
    /// Harmonic synthesis of logic and aesthetic.
    pub understanding: f64,
    /// Performance minus the entropy penalty.
    pub utility: f64,
    /// The token drawn at this step.
    pub token: TokenId,
    /// Probability mass per token at this step, indexed by token.
    pub probabilities: Vec<f64>,
}

impl MetricRecord {
    /// Assemble a record from its step index, metric values, token, and
    /// probability snapshot.
    pub fn new(step: u64, values: MetricValues, token: TokenId, probabilities: Vec<f64>) -> Self {
        Self {
            step,
            logic: values.logic,
            aesthetic: values.aesthetic,
            understanding: values.understanding,
            utility: values.utility,
            token,
            probabilities,
        }
    }

    /// Return the four metric values of this record.
    pub const fn values(&self) -> MetricValues {
        MetricValues {
            logic: self.logic,
            aesthetic: self.aesthetic,
            understanding: self.understanding,
            utility: self.utility,
        }
    }

    /// Return the value for a single metric.
    pub const fn metric(&self, kind: MetricKind) -> f64 {
        self.values().get(kind)
    }
}

// ---------------------------------------------------------------------------
// Summary reduction
// ---------------------------------------------------------------------------

/// Descriptive statistics of one metric over a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MetricStats {
    /// Arithmetic mean over all recorded steps.
    pub mean: f64,
    /// Value at the final recorded step.
    pub last: f64,
    /// Smallest value observed.
    pub min: f64,
    /// Largest value observed.
    pub max: f64,
}

/// Per-metric statistics over a completed (or partial) run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MetricSummary {
    /// Number of steps the summary covers.
    pub steps: u64,
    /// Logic statistics.
    pub logic: MetricStats,
    /// Aesthetic statistics.
    pub aesthetic: MetricStats,
    /// Understanding statistics.
    pub understanding: MetricStats,
    /// Utility statistics.
    pub utility: MetricStats,
}

impl MetricSummary {
    /// Return the statistics for a single metric.
    pub const fn get(&self, kind: MetricKind) -> &MetricStats {
        match kind {
            MetricKind::Logic => &self.logic,
            MetricKind::Aesthetic => &self.aesthetic,
            MetricKind::Understanding => &self.understanding,
            MetricKind::Utility => &self.utility,
        }
    }
}

// ---------------------------------------------------------------------------
// Projections for dashboards
// ---------------------------------------------------------------------------

/// A single metric over time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TimeSeries {
    /// Which metric this series carries.
    pub metric: MetricKind,
    /// Step indices, parallel to `values`.
    pub steps: Vec<u64>,
    /// Metric values, parallel to `steps`.
    pub values: Vec<f64>,
}

/// One point of the logic-versus-aesthetic phase-space trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PhasePoint {
    /// Step index of the point.
    pub step: u64,
    /// Horizontal coordinate.
    pub logic: f64,
    /// Vertical coordinate.
    pub aesthetic: f64,
    /// Marker weight.
    pub understanding: f64,
}

/// Realized token frequencies over a contiguous range of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct HeatmapBucket {
    /// First step in the bucket (inclusive).
    pub start_step: u64,
    /// Last step in the bucket (inclusive).
    pub end_step: u64,
    /// Fraction of draws in the bucket that hit each token, indexed by token.
    pub frequencies: Vec<f64>,
}

/// Probability heatmap: the expected table next to realized frequencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Heatmap {
    /// Vocabulary size (number of heatmap rows).
    pub vocabulary_size: u32,
    /// Probability table mass per token from the latest snapshot.
    pub expected: Vec<f64>,
    /// Realized frequencies, one column per bucket of steps.
    pub buckets: Vec<HeatmapBucket>,
}

// ---------------------------------------------------------------------------
// Run metadata
// ---------------------------------------------------------------------------

/// Identity and parameters of a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RunInfo {
    /// Unique run identifier.
    pub run_id: RunId,
    /// Seed the token source was created with.
    pub seed: u64,
    /// Vocabulary size.
    pub vocabulary_size: u32,
    /// Power-law exponent of the probability table.
    pub power_law_exponent: f64,
    /// Number of steps requested.
    pub target_steps: u64,
    /// How the run is consumed.
    pub mode: RunMode,
    /// Wall-clock time the run was created.
    pub started_at: DateTime<Utc>,
}
