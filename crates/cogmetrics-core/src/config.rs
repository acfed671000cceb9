//! Configuration loading and typed config structures for the simulation.
//!
//! The canonical configuration lives in `cogmetrics-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror the
//! YAML structure, a loader that reads the file, and [`SimulationConfig::validate`]
//! which rejects unusable parameters before any token is drawn.
//!
//! Defaults reproduce the reference run: a 10-token vocabulary, decay 0.91,
//! entropy penalty 0.4, 150 steps, seed 42.

use std::path::Path;

use cogmetrics_types::RunMode;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override could not be parsed.
    #[error("invalid value for {name}: {value:?}")]
    Env {
        /// The environment variable name.
        name: &'static str,
        /// The raw value that failed to parse.
        value: String,
    },

    /// The loaded configuration failed validation.
    #[error("invalid configuration: {source}")]
    Invalid {
        /// The underlying validation error.
        #[from]
        source: ConfigurationError,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// A parameter that makes the simulation meaningless.
///
/// Raised eagerly, before any token is drawn, and never recovered from.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    /// Fewer than two tokens cannot form a distribution.
    #[error("vocabulary size must be at least 2, got {size}")]
    VocabularyTooSmall {
        /// The rejected vocabulary size.
        size: u32,
    },

    /// A power law needs a positive, finite decay exponent.
    #[error("power-law exponent must be positive and finite, got {value}")]
    NonPositiveExponent {
        /// The rejected exponent.
        value: f64,
    },

    /// The exponent is so steep that tail masses underflow to zero.
    #[error(
        "power-law exponent {exponent} underflows the tail of a {vocabulary_size}-token vocabulary"
    )]
    ExponentUnderflow {
        /// The vocabulary size the table was requested for.
        vocabulary_size: u32,
        /// The rejected exponent.
        exponent: f64,
    },

    /// An exponential decay constant outside the open interval (0, 1).
    #[error("{parameter} must lie strictly between 0 and 1, got {value}")]
    InvalidDecay {
        /// Which decay parameter was rejected.
        parameter: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// The entropy window must hold at least one draw.
    #[error("aesthetic window must be at least 1")]
    ZeroWindow,

    /// A run must request at least one step.
    #[error("step count must be at least 1")]
    ZeroSteps,

    /// The fidelity threshold must be a probability in (0, 1].
    #[error("fidelity threshold must lie in (0, 1], got {value}")]
    InvalidThreshold {
        /// The rejected threshold.
        value: f64,
    },

    /// The entropy target band must lie in [0, 1].
    #[error("entropy target must lie in [0, 1], got {value}")]
    InvalidEntropyTarget {
        /// The rejected target.
        value: f64,
    },

    /// The entropy penalty weight must be finite and non-negative.
    #[error("entropy penalty must be finite and non-negative, got {value}")]
    InvalidPenalty {
        /// The rejected penalty weight.
        value: f64,
    },
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `cogmetrics-config.yaml`. Every field has a
/// default, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Token source parameters.
    #[serde(default)]
    pub source: SourceConfig,

    /// Metric smoothing parameters.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Run length, mode, and pacing.
    #[serde(default)]
    pub simulation: RunConfig,

    /// Observer server binding.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `COGMETRICS_SEED` overrides `source.seed`
    /// - `COGMETRICS_STEPS` overrides `simulation.steps`
    /// - `OBSERVER_HOST` overrides `observer.host`
    /// - `OBSERVER_PORT` overrides `observer.port`
    ///
    /// The result is not validated; call [`validate`](Self::validate) once
    /// all overrides (including command-line flags) are applied.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. No environment overrides
    /// are applied.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("COGMETRICS_SEED") {
            let seed = raw.trim().parse::<u64>().map_err(|_err| ConfigError::Env {
                name: "COGMETRICS_SEED",
                value: raw.clone(),
            })?;
            self.source.seed = Some(seed);
        }
        if let Some(raw) = lookup("COGMETRICS_STEPS") {
            self.simulation.steps = raw.trim().parse::<u64>().map_err(|_err| ConfigError::Env {
                name: "COGMETRICS_STEPS",
                value: raw.clone(),
            })?;
        }
        if let Some(host) = lookup("OBSERVER_HOST") {
            self.observer.host = host;
        }
        if let Some(raw) = lookup("OBSERVER_PORT") {
            self.observer.port = raw.trim().parse::<u16>().map_err(|_err| ConfigError::Env {
                name: "OBSERVER_PORT",
                value: raw.clone(),
            })?;
        }
        Ok(())
    }

    /// Check every parameter, returning the first problem found.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.source.validate()?;
        self.metrics.validate()?;
        self.simulation.validate()
    }
}

/// Token source parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceConfig {
    /// Number of distinct tokens in the vocabulary.
    #[serde(default = "default_vocabulary_size")]
    pub vocabulary_size: u32,

    /// Exponent `α` of the rank power law `mass(r) ∝ r^(-α)`.
    #[serde(default = "default_power_law_exponent")]
    pub power_law_exponent: f64,

    /// Random seed for reproducibility. An explicit `null` asks for a
    /// fresh seed, which is then reported by the clock.
    #[serde(default = "default_seed")]
    pub seed: Option<u64>,
}

impl SourceConfig {
    /// Check vocabulary size and exponent.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_source(self.vocabulary_size, self.power_law_exponent)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            vocabulary_size: default_vocabulary_size(),
            power_law_exponent: default_power_law_exponent(),
            seed: default_seed(),
        }
    }
}

/// Check the two parameters that define a probability table.
pub fn validate_source(vocabulary_size: u32, exponent: f64) -> Result<(), ConfigurationError> {
    if vocabulary_size < 2 {
        return Err(ConfigurationError::VocabularyTooSmall {
            size: vocabulary_size,
        });
    }
    if !exponent.is_finite() || exponent <= 0.0 {
        return Err(ConfigurationError::NonPositiveExponent { value: exponent });
    }
    // The last rank carries the smallest raw weight.
    if !f64::from(vocabulary_size).powf(-exponent).is_normal() {
        return Err(ConfigurationError::ExponentUnderflow {
            vocabulary_size,
            exponent,
        });
    }
    Ok(())
}

/// Smoothing parameters for the metric engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MetricsConfig {
    /// Decay of the fidelity moving average behind `logic`.
    #[serde(default = "default_decay")]
    pub logic_decay: f64,

    /// Probability a token must reach to count as a faithful draw.
    /// Defaults to the mean mass `1 / V` when unset.
    #[serde(default)]
    pub fidelity_threshold: Option<f64>,

    /// Number of recent draws whose entropy drives `aesthetic`.
    #[serde(default = "default_aesthetic_window")]
    pub aesthetic_window: usize,

    /// Decay of the performance moving average behind `utility`.
    #[serde(default = "default_decay")]
    pub utility_decay: f64,

    /// Normalized entropy above which `utility` is penalized.
    #[serde(default = "default_entropy_target")]
    pub entropy_target: f64,

    /// Penalty per unit of normalized entropy above the target.
    #[serde(default = "default_entropy_penalty")]
    pub entropy_penalty: f64,
}

impl MetricsConfig {
    /// Check every smoothing parameter.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_decay("logic_decay", self.logic_decay)?;
        validate_decay("utility_decay", self.utility_decay)?;
        if self.aesthetic_window == 0 {
            return Err(ConfigurationError::ZeroWindow);
        }
        if let Some(threshold) = self.fidelity_threshold {
            if !threshold.is_finite() || threshold <= 0.0 || threshold > 1.0 {
                return Err(ConfigurationError::InvalidThreshold { value: threshold });
            }
        }
        if !(0.0..=1.0).contains(&self.entropy_target) {
            return Err(ConfigurationError::InvalidEntropyTarget {
                value: self.entropy_target,
            });
        }
        if !self.entropy_penalty.is_finite() || self.entropy_penalty < 0.0 {
            return Err(ConfigurationError::InvalidPenalty {
                value: self.entropy_penalty,
            });
        }
        Ok(())
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            logic_decay: default_decay(),
            fidelity_threshold: None,
            aesthetic_window: default_aesthetic_window(),
            utility_decay: default_decay(),
            entropy_target: default_entropy_target(),
            entropy_penalty: default_entropy_penalty(),
        }
    }
}

fn validate_decay(parameter: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidDecay { parameter, value })
    }
}

/// Run length, mode, and pacing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunConfig {
    /// Number of steps to record.
    #[serde(default = "default_steps")]
    pub steps: u64,

    /// Headless summary or paced dashboard run.
    #[serde(default)]
    pub mode: RunMode,

    /// Delay between steps in dashboard mode, in milliseconds.
    #[serde(default = "default_step_interval_ms")]
    pub step_interval_ms: u64,
}

impl RunConfig {
    /// Check the step count.
    pub const fn validate(&self) -> Result<(), ConfigurationError> {
        if self.steps == 0 {
            return Err(ConfigurationError::ZeroSteps);
        }
        Ok(())
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            mode: RunMode::default(),
            step_interval_ms: default_step_interval_ms(),
        }
    }
}

/// Observer server binding.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObserverConfig {
    /// Host address to bind to.
    #[serde(default = "default_observer_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_observer_port")]
    pub port: u16,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            host: default_observer_host(),
            port: default_observer_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON log lines instead of human-readable text.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_vocabulary_size() -> u32 {
    10
}

const fn default_power_law_exponent() -> f64 {
    1.5
}

#[allow(clippy::unnecessary_wraps)]
const fn default_seed() -> Option<u64> {
    Some(42)
}

const fn default_decay() -> f64 {
    0.91
}

const fn default_aesthetic_window() -> usize {
    64
}

const fn default_entropy_target() -> f64 {
    0.85
}

const fn default_entropy_penalty() -> f64 {
    0.4
}

const fn default_steps() -> u64 {
    150
}

const fn default_step_interval_ms() -> u64 {
    50
}

fn default_observer_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_observer_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        assert_eq!(config.source.vocabulary_size, 10);
        assert_eq!(config.source.seed, Some(42));
        assert_eq!(config.simulation.steps, 150);
        assert_eq!(config.simulation.mode, RunMode::Headless);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r"
source:
  vocabulary_size: 100
  power_law_exponent: 1.5
  seed: 42

metrics:
  logic_decay: 0.8
  fidelity_threshold: 0.02
  aesthetic_window: 128
  utility_decay: 0.95
  entropy_target: 0.7
  entropy_penalty: 0.5

simulation:
  steps: 1000
  mode: dashboard
  step_interval_ms: 10

observer:
  host: 127.0.0.1
  port: 9090

logging:
  level: debug
  json: true
";
        let config = SimulationConfig::parse(yaml).unwrap();
        assert_eq!(config.source.vocabulary_size, 100);
        assert_eq!(config.metrics.aesthetic_window, 128);
        assert_eq!(config.metrics.fidelity_threshold, Some(0.02));
        assert_eq!(config.simulation.steps, 1000);
        assert_eq!(config.simulation.mode, RunMode::Dashboard);
        assert_eq!(config.observer.port, 9090);
        assert!(config.logging.json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = SimulationConfig::parse("source:\n  seed: 7\n").unwrap();
        assert_eq!(config.source.seed, Some(7));
        assert_eq!(config.source.vocabulary_size, 10);
        assert_eq!(config.simulation.steps, 150);
    }

    #[test]
    fn explicit_null_seed_requests_fresh_seed() {
        let config = SimulationConfig::parse("source:\n  seed: null\n").unwrap();
        assert_eq!(config.source.seed, None);
    }

    #[test]
    fn parse_empty_yaml() {
        assert!(SimulationConfig::parse("").is_ok());
    }

    #[test]
    fn vocabulary_of_one_is_rejected() {
        let mut config = SimulationConfig::default();
        config.source.vocabulary_size = 1;
        assert_eq!(
            config.validate(),
            Err(ConfigurationError::VocabularyTooSmall { size: 1 })
        );
    }

    #[test]
    fn zero_and_negative_exponents_are_rejected() {
        for value in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let mut config = SimulationConfig::default();
            config.source.power_law_exponent = value;
            assert!(matches!(
                config.validate(),
                Err(ConfigurationError::NonPositiveExponent { .. })
            ));
        }
    }

    #[test]
    fn exponent_that_underflows_the_tail_is_rejected() {
        let mut config = SimulationConfig::default();
        config.source.vocabulary_size = 1000;
        config.source.power_law_exponent = 120.0;
        assert_eq!(
            config.validate(),
            Err(ConfigurationError::ExponentUnderflow {
                vocabulary_size: 1000,
                exponent: 120.0,
            })
        );

        config.source.power_law_exponent = 3.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn decays_must_be_open_unit_interval() {
        for value in [0.0, 1.0, -0.5, 2.0] {
            let mut config = SimulationConfig::default();
            config.metrics.logic_decay = value;
            assert!(matches!(
                config.validate(),
                Err(ConfigurationError::InvalidDecay {
                    parameter: "logic_decay",
                    ..
                })
            ));
        }
        let mut config = SimulationConfig::default();
        config.metrics.utility_decay = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidDecay {
                parameter: "utility_decay",
                ..
            })
        ));
    }

    #[test]
    fn zero_window_and_zero_steps_are_rejected() {
        let mut config = SimulationConfig::default();
        config.metrics.aesthetic_window = 0;
        assert_eq!(config.validate(), Err(ConfigurationError::ZeroWindow));

        let mut config = SimulationConfig::default();
        config.simulation.steps = 0;
        assert_eq!(config.validate(), Err(ConfigurationError::ZeroSteps));
    }

    #[test]
    fn threshold_target_and_penalty_bounds() {
        let mut config = SimulationConfig::default();
        config.metrics.fidelity_threshold = Some(0.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidThreshold { .. })
        ));

        let mut config = SimulationConfig::default();
        config.metrics.entropy_target = 1.2;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidEntropyTarget { .. })
        ));

        let mut config = SimulationConfig::default();
        config.metrics.entropy_penalty = -0.1;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidPenalty { .. })
        ));
    }

    #[test]
    fn overrides_apply_from_lookup() {
        let vars: BTreeMap<&str, &str> = [
            ("COGMETRICS_SEED", "43"),
            ("COGMETRICS_STEPS", "1000"),
            ("OBSERVER_HOST", "127.0.0.1"),
            ("OBSERVER_PORT", "9191"),
        ]
        .into_iter()
        .collect();
        let mut config = SimulationConfig::default();
        config
            .apply_overrides_from(|name| vars.get(name).map(|v| (*v).to_owned()))
            .unwrap();
        assert_eq!(config.source.seed, Some(43));
        assert_eq!(config.simulation.steps, 1000);
        assert_eq!(config.observer.host, "127.0.0.1");
        assert_eq!(config.observer.port, 9191);
    }

    #[test]
    fn malformed_override_is_reported() {
        let mut config = SimulationConfig::default();
        let result = config.apply_overrides_from(|name| {
            (name == "COGMETRICS_SEED").then(|| "forty-two".to_owned())
        });
        assert!(matches!(
            result,
            Err(ConfigError::Env {
                name: "COGMETRICS_SEED",
                ..
            })
        ));
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("cogmetrics-config.yaml");
        if path.exists() {
            let config = SimulationConfig::parse(&std::fs::read_to_string(&path).unwrap());
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
            assert!(config.unwrap().validate().is_ok());
        }
    }
}
