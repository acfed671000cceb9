//! Emergent metric engine.
//!
//! The engine consumes one token per step and keeps three running
//! statistics:
//!
//! - a fidelity moving average (share of draws at or above the fidelity
//!   threshold), which becomes **logic**;
//! - the token counts of the last `aesthetic_window` draws, whose Shannon
//!   entropy divided by `ln V` becomes **aesthetic**;
//! - a performance moving average of `p(token) / p_max`, which minus an
//!   entropy penalty becomes **utility**.
//!
//! **Understanding** is the harmonic mean of logic and aesthetic:
//! `u = 2·l·a / (l + a)`. It is 0 whenever either input is 0, always lies
//! between `min(l, a)` and `max(l, a)`, and never exceeds `2·min(l, a)`.
//!
//! Utility is `clamp(performance − w·max(0, aesthetic − target), 0, 1)`
//! with `w = entropy_penalty` and `target = entropy_target`.
//!
//! All outputs lie in `[0, 1]` and are never NaN.

use std::collections::VecDeque;

use cogmetrics_types::{MetricValues, TokenId};

use crate::config::MetricsConfig;
use crate::token::ProbabilityTable;

/// The engine was used out of order or with inputs it was not bound to.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// [`MetricEngine::step`] was called before [`MetricEngine::initialize`].
    #[error("metric engine stepped before initialization")]
    NotInitialized,

    /// The token is not part of the bound vocabulary.
    #[error("token {token} outside vocabulary of size {vocabulary_size}")]
    TokenOutOfRange {
        /// The offending token.
        token: TokenId,
        /// Size of the bound vocabulary.
        vocabulary_size: usize,
    },

    /// The table passed to `step` does not match the bound vocabulary.
    #[error("probability table has {actual} tokens, engine bound to {expected}")]
    VocabularyMismatch {
        /// Size of the bound vocabulary.
        expected: usize,
        /// Size of the table passed in.
        actual: usize,
    },
}

/// Running sufficient statistics, created on [`MetricEngine::initialize`].
#[derive(Debug, Clone, PartialEq)]
pub struct EngineState {
    vocabulary_size: usize,
    max_entropy: f64,
    fidelity_threshold: f64,
    peak_mass: f64,
    fidelity: f64,
    performance: f64,
    window: VecDeque<TokenId>,
    counts: Vec<u64>,
    steps: u64,
}

impl EngineState {
    fn new(table: &ProbabilityTable, config: &MetricsConfig) -> Self {
        let vocabulary_size = table.vocabulary_size();
        #[allow(clippy::cast_precision_loss)]
        let max_entropy = (vocabulary_size as f64).ln();
        Self {
            vocabulary_size,
            max_entropy,
            fidelity_threshold: config
                .fidelity_threshold
                .unwrap_or_else(|| table.mean_mass()),
            peak_mass: table.peak_mass(),
            fidelity: 0.0,
            performance: 0.0,
            window: VecDeque::with_capacity(config.aesthetic_window),
            counts: vec![0; vocabulary_size],
            steps: 0,
        }
    }

    /// Number of steps folded into this state.
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// Number of draws currently in the entropy window.
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Normalized entropy of the current window.
    #[allow(clippy::cast_precision_loss)]
    fn window_entropy(&self) -> f64 {
        let total = self.window.len() as f64;
        let counts = self.counts.iter().map(|&c| c as f64);
        normalized_entropy(counts, total, self.max_entropy)
    }

    fn push(&mut self, token: TokenId, capacity: usize) {
        self.window.push_back(token);
        if let Some(count) = self.counts.get_mut(token.index()) {
            *count = count.saturating_add(1);
        }
        while self.window.len() > capacity {
            if let Some(evicted) = self.window.pop_front() {
                if let Some(count) = self.counts.get_mut(evicted.index()) {
                    *count = count.saturating_sub(1);
                }
            }
        }
    }
}

/// Computes logic, aesthetic, understanding, and utility from a token
/// stream, one step at a time.
#[derive(Debug, Clone)]
pub struct MetricEngine {
    config: MetricsConfig,
    state: Option<EngineState>,
}

impl MetricEngine {
    /// Create an engine that is not yet bound to a vocabulary.
    pub const fn new(config: MetricsConfig) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Bind the engine to a probability table, discarding any prior state.
    pub fn initialize(&mut self, table: &ProbabilityTable) {
        self.state = Some(EngineState::new(table, &self.config));
    }

    /// Whether [`initialize`](Self::initialize) has been called.
    pub const fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// The running statistics, if initialized.
    pub const fn state(&self) -> Option<&EngineState> {
        self.state.as_ref()
    }

    /// The smoothing configuration.
    pub const fn config(&self) -> &MetricsConfig {
        &self.config
    }

    /// Fold one token into the running state and return the metrics at
    /// this step.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::NotInitialized`] before `initialize`,
    /// [`StateError::VocabularyMismatch`] if `table` differs in size from
    /// the bound one, and [`StateError::TokenOutOfRange`] for foreign tokens.
    /// On error the state is left untouched.
    pub fn step(
        &mut self,
        token: TokenId,
        table: &ProbabilityTable,
    ) -> Result<MetricValues, StateError> {
        let state = self.state.as_mut().ok_or(StateError::NotInitialized)?;

        if table.vocabulary_size() != state.vocabulary_size {
            return Err(StateError::VocabularyMismatch {
                expected: state.vocabulary_size,
                actual: table.vocabulary_size(),
            });
        }
        let mass = table.mass(token).ok_or(StateError::TokenOutOfRange {
            token,
            vocabulary_size: state.vocabulary_size,
        })?;

        // Logic: fidelity moving average.
        let faithful = if mass >= state.fidelity_threshold { 1.0 } else { 0.0 };
        state.fidelity = ewma(state.fidelity, faithful, self.config.logic_decay);

        // Aesthetic: realized entropy over the window.
        state.push(token, self.config.aesthetic_window);
        let aesthetic = state.window_entropy();

        // Utility: performance moving average minus entropy penalty.
        let hit = if state.peak_mass > 0.0 {
            (mass / state.peak_mass).clamp(0.0, 1.0)
        } else {
            0.0
        };
        state.performance = ewma(state.performance, hit, self.config.utility_decay);
        let excess = (aesthetic - self.config.entropy_target).max(0.0);
        let utility = unit(state.performance - self.config.entropy_penalty * excess);

        state.steps = state.steps.saturating_add(1);

        let logic = unit(state.fidelity);
        Ok(MetricValues {
            logic,
            aesthetic,
            understanding: harmonic_mean(logic, aesthetic),
            utility,
        })
    }
}

/// Exponentially weighted moving average with decay `d`:
/// `d·previous + (1 − d)·sample`.
fn ewma(previous: f64, sample: f64, decay: f64) -> f64 {
    decay.mul_add(previous, (1.0 - decay) * sample)
}

/// Clamp to `[0, 1]`, mapping non-finite values to 0.
fn unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Harmonic mean of two values in `[0, 1]`; 0 when both are 0.
pub fn harmonic_mean(a: f64, b: f64) -> f64 {
    let sum = a + b;
    if sum <= f64::EPSILON {
        return 0.0;
    }
    unit(2.0 * a * b / sum)
}

/// Shannon entropy (natural log) of the counts, divided by `max_entropy`.
///
/// Returns 0 for an empty window or a degenerate maximum.
pub fn normalized_entropy<I>(counts: I, total: f64, max_entropy: f64) -> f64
where
    I: IntoIterator<Item = f64>,
{
    if total <= 0.0 || max_entropy <= 0.0 {
        return 0.0;
    }
    let entropy: f64 = counts
        .into_iter()
        .filter(|&c| c > 0.0)
        .map(|c| {
            let p = c / total;
            -p * p.ln()
        })
        .sum();
    unit(entropy / max_entropy)
}
