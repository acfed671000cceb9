//! Simulation clock: the step loop that ties the pipeline together.
//!
//! Each step draws a token from the [`TokenSource`], feeds it to the
//! [`MetricEngine`], assembles a [`MetricRecord`] with the probability
//! snapshot, appends it to the [`HistoryStore`], and hands it back to the
//! caller.
//!
//! # Design Principles
//!
//! - A step either completes fully or leaves history untouched.
//! - Records are produced on demand; there is no background work. Callers
//!   pull with [`SimulationClock::step`] or the lazy [`RunSteps`] iterator
//!   and may stop at any point.
//! - Two clocks built from the same configuration and seed produce
//!   identical record sequences.

use chrono::Utc;
use cogmetrics_types::{MetricRecord, RunId, RunInfo, RunMode};
use rand::Rng;
use tracing::{debug, info};

use crate::config::{ConfigurationError, MetricsConfig, SimulationConfig};
use crate::history::HistoryStore;
use crate::metrics::{MetricEngine, StateError};
use crate::token::{ProbabilityTable, TokenSource};

/// Errors that can occur while stepping the clock.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// The metric engine rejected the step.
    #[error("metric engine error: {source}")]
    Engine {
        /// The underlying state error.
        #[from]
        source: StateError,
    },

    /// Step counter would overflow.
    #[error("step counter overflow: cannot advance beyond u64::MAX")]
    StepOverflow,
}

/// Drives the token → metrics → record pipeline and owns the history.
///
/// Not `Clone`, for the same reason as [`TokenSource`].
#[derive(Debug)]
pub struct SimulationClock {
    source: TokenSource,
    engine: MetricEngine,
    history: HistoryStore,
    next_step: u64,
    info: RunInfo,
}

impl SimulationClock {
    /// Validate the configuration and build a fresh token source and
    /// metric engine.
    ///
    /// When `source.seed` is `None` a fresh seed is drawn from the thread
    /// RNG and reported through [`seed`](Self::seed).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] for any invalid parameter. No token
    /// is drawn in that case.
    pub fn new(config: &SimulationConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let seed = config
            .source
            .seed
            .unwrap_or_else(|| rand::rng().random::<u64>());
        let source = TokenSource::new(
            config.source.vocabulary_size,
            config.source.power_law_exponent,
            seed,
        )?;

        let mut clock = Self::from_parts(source, MetricEngine::new(config.metrics.clone()));
        clock.info.target_steps = config.simulation.steps;
        clock.info.mode = config.simulation.mode;

        info!(
            run_id = %clock.info.run_id,
            seed,
            vocabulary_size = config.source.vocabulary_size,
            exponent = config.source.power_law_exponent,
            steps = config.simulation.steps,
            seed_was_random = config.source.seed.is_none(),
            "Simulation clock initialized"
        );

        Ok(clock)
    }

    /// Assemble a clock from an existing source and engine. The engine is
    /// (re)bound to the source's probability table.
    pub fn from_parts(source: TokenSource, mut engine: MetricEngine) -> Self {
        engine.initialize(source.table());
        let info = RunInfo {
            run_id: RunId::new(),
            seed: source.seed(),
            vocabulary_size: u32::try_from(source.table().vocabulary_size()).unwrap_or(u32::MAX),
            power_law_exponent: source.table().exponent(),
            target_steps: 0,
            mode: RunMode::default(),
            started_at: Utc::now(),
        };
        Self {
            source,
            engine,
            history: HistoryStore::new(),
            next_step: 0,
            info,
        }
    }

    /// Run one step and return its record.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::Engine`] if the metric engine rejects the
    /// token and [`ClockError::StepOverflow`] if the step counter is
    /// exhausted. History is unchanged on error.
    pub fn step(&mut self) -> Result<MetricRecord, ClockError> {
        let step = self.next_step;
        let following = step.checked_add(1).ok_or(ClockError::StepOverflow)?;

        let token = self.source.next_token();
        let values = self.engine.step(token, self.source.table())?;
        let record = MetricRecord::new(step, values, token, self.source.table().snapshot());

        self.history.append(record.clone());
        self.next_step = following;

        debug!(
            step,
            token = %token,
            logic = values.logic,
            aesthetic = values.aesthetic,
            understanding = values.understanding,
            utility = values.utility,
            "Step recorded"
        );

        Ok(record)
    }

    /// Lazily run up to `steps` more steps.
    ///
    /// Dropping the iterator early stops the run; history then ends at the
    /// last record the iterator yielded.
    pub const fn run_steps(&mut self, steps: u64) -> RunSteps<'_> {
        RunSteps {
            clock: self,
            remaining: steps,
        }
    }

    /// Read-only view of every recorded step.
    pub const fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// The probability table driving the token source.
    pub fn table(&self) -> &ProbabilityTable {
        self.source.table()
    }

    /// The seed of the token source.
    pub const fn seed(&self) -> u64 {
        self.source.seed()
    }

    /// Number of steps recorded so far.
    pub const fn steps_run(&self) -> u64 {
        self.next_step
    }

    /// Smoothing configuration of the metric engine.
    pub const fn metrics_config(&self) -> &MetricsConfig {
        self.engine.config()
    }

    /// Identity and parameters of this run.
    pub const fn run_info(&self) -> &RunInfo {
        &self.info
    }

    /// Consume the clock, keeping only its history.
    pub fn into_history(self) -> HistoryStore {
        self.history
    }
}

/// Lazy, finite sequence of records produced by [`SimulationClock::run_steps`].
#[derive(Debug)]
pub struct RunSteps<'a> {
    clock: &'a mut SimulationClock,
    remaining: u64,
}

impl RunSteps<'_> {
    /// Steps left before the iterator is exhausted.
    pub const fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Iterator for RunSteps<'_> {
    type Item = Result<MetricRecord, ClockError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let result = self.clock.step();
        self.remaining = if result.is_ok() {
            self.remaining.saturating_sub(1)
        } else {
            0
        };
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (0, Some(remaining))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cogmetrics_types::TokenId;

    use super::*;

    fn config(vocabulary_size: u32, exponent: f64, seed: u64, steps: u64) -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.source.vocabulary_size = vocabulary_size;
        config.source.power_law_exponent = exponent;
        config.source.seed = Some(seed);
        config.simulation.steps = steps;
        config
    }

    fn run(config: &SimulationConfig) -> Vec<MetricRecord> {
        let mut clock = SimulationClock::new(config).unwrap();
        clock
            .run_steps(config.simulation.steps)
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn clock_starts_empty() {
        let clock = SimulationClock::new(&SimulationConfig::default()).unwrap();
        assert_eq!(clock.steps_run(), 0);
        assert!(clock.history().latest().is_none());
        assert_eq!(clock.seed(), 42);
    }

    #[test]
    fn step_appends_and_returns_record() {
        let mut clock = SimulationClock::new(&SimulationConfig::default()).unwrap();
        let record = clock.step().unwrap();
        assert_eq!(record.step, 0);
        assert_eq!(clock.history().len(), 1);
        assert_eq!(clock.history().latest(), Some(&record));
        assert_eq!(record.probabilities, clock.table().masses());

        let second = clock.step().unwrap();
        assert_eq!(second.step, 1);
        assert_eq!(clock.steps_run(), 2);
    }

    #[test]
    fn run_steps_yields_exactly_n_records() {
        let mut clock = SimulationClock::new(&SimulationConfig::default()).unwrap();
        let records: Vec<_> = clock.run_steps(25).map(Result::unwrap).collect();
        assert_eq!(records.len(), 25);
        assert_eq!(clock.history().len(), 25);
        let steps: Vec<u64> = clock.history().iter().map(|r| r.step).collect();
        assert_eq!(steps, (0..25).collect::<Vec<_>>());
    }

    #[test]
    fn early_cancellation_keeps_completed_steps() {
        let mut clock = SimulationClock::new(&SimulationConfig::default()).unwrap();
        {
            let mut steps = clock.run_steps(100);
            for _ in 0..7 {
                steps.next().unwrap().unwrap();
            }
            assert_eq!(steps.remaining(), 93);
        }
        assert_eq!(clock.history().len(), 7);
        assert_eq!(clock.history().latest().unwrap().step, 6);

        // Resuming continues from the boundary.
        let next = clock.step().unwrap();
        assert_eq!(next.step, 7);
    }

    #[test]
    fn same_seed_is_deterministic() {
        let cfg = config(100, 1.5, 42, 1000);
        let a = run(&cfg);
        let b = run(&cfg);
        assert_eq!(a.len(), 1000);
        assert_eq!(a, b);
        assert_eq!(a.last(), b.last());
    }

    #[test]
    fn different_seed_changes_tokens() {
        let a = run(&config(100, 1.5, 42, 1000));
        let b = run(&config(100, 1.5, 43, 1000));
        let tokens_a: Vec<TokenId> = a.iter().map(|r| r.token).collect();
        let tokens_b: Vec<TokenId> = b.iter().map(|r| r.token).collect();
        assert_ne!(tokens_a, tokens_b);
    }

    #[test]
    fn every_metric_stays_in_unit_interval() {
        for record in run(&config(100, 1.5, 42, 1000)) {
            for value in [
                record.logic,
                record.aesthetic,
                record.understanding,
                record.utility,
            ] {
                assert!((0.0..=1.0).contains(&value), "step {}: {value}", record.step);
            }
        }
    }

    #[test]
    fn invalid_configuration_fails_before_any_draw() {
        assert_eq!(
            SimulationClock::new(&config(1, 1.5, 42, 10)).err(),
            Some(ConfigurationError::VocabularyTooSmall { size: 1 })
        );
        assert!(matches!(
            SimulationClock::new(&config(10, 0.0, 42, 10)),
            Err(ConfigurationError::NonPositiveExponent { .. })
        ));
        assert_eq!(
            SimulationClock::new(&config(10, 1.5, 42, 0)).err(),
            Some(ConfigurationError::ZeroSteps)
        );
    }

    #[test]
    fn missing_seed_is_chosen_and_reported() {
        let mut cfg = SimulationConfig::default();
        cfg.source.seed = None;
        let clock = SimulationClock::new(&cfg).unwrap();
        assert_eq!(clock.run_info().seed, clock.seed());

        // The reported seed reproduces the run.
        let mut replay = SimulationConfig::default();
        replay.source.seed = Some(clock.seed());
        let mut original = clock;
        let mut again = SimulationClock::new(&replay).unwrap();
        let a: Vec<_> = original.run_steps(50).map(Result::unwrap).collect();
        let b: Vec<_> = again.run_steps(50).map(Result::unwrap).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn run_info_reflects_configuration() {
        let cfg = config(100, 1.5, 42, 1000);
        let clock = SimulationClock::new(&cfg).unwrap();
        let info = clock.run_info();
        assert_eq!(info.vocabulary_size, 100);
        assert_eq!(info.target_steps, 1000);
        assert_eq!(info.seed, 42);
        assert!((info.power_law_exponent - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn from_parts_binds_engine() {
        let source = TokenSource::new(10, 1.5, 9).unwrap();
        let mut clock = SimulationClock::from_parts(source, MetricEngine::new(MetricsConfig::default()));
        assert!(clock.step().is_ok());
        assert_eq!(clock.into_history().len(), 1);
    }
}
