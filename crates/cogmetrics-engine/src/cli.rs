//! Command-line arguments.
//!
//! Flags override values loaded from the configuration file, which in
//! turn override the built-in defaults.

use std::path::PathBuf;

use clap::Parser;
use cogmetrics_core::config::SimulationConfig;
use cogmetrics_types::RunMode;

/// Default configuration file, read from the working directory if present.
pub const DEFAULT_CONFIG_PATH: &str = "cogmetrics-config.yaml";

/// Emergent cognitive metrics simulator
#[derive(Parser, Debug)]
#[command(name = "cogmetrics-engine")]
#[command(about = "Simulate emergent cognitive metrics over a power-law token stream")]
#[allow(clippy::struct_excessive_bools)]
pub struct Args {
    /// Path to the YAML configuration file (must exist when given)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Run without the observer and print the final metrics
    #[arg(long, conflicts_with = "dashboard")]
    pub headless: bool,

    /// Serve the live observer dashboard while the run progresses
    #[arg(long)]
    pub dashboard: bool,

    /// Seed for the token stream
    #[arg(long, short = 's', conflicts_with = "random_seed")]
    pub seed: Option<u64>,

    /// Draw a fresh seed; it is reported when the run ends
    #[arg(long)]
    pub random_seed: bool,

    /// Number of steps to run
    #[arg(long, short = 'n')]
    pub steps: Option<u64>,

    /// Number of distinct tokens
    #[arg(long)]
    pub vocabulary_size: Option<u32>,

    /// Power-law exponent of the token distribution
    #[arg(long, short = 'a')]
    pub exponent: Option<f64>,

    /// Delay between steps in dashboard mode, in milliseconds
    #[arg(long)]
    pub step_interval_ms: Option<u64>,

    /// Observer port in dashboard mode
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Write the full history as JSON lines to this file
    #[arg(long, short = 'o')]
    pub export: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,
}

impl Args {
    /// Apply every flag that was given on top of `config`.
    pub fn apply(&self, config: &mut SimulationConfig) {
        if self.headless {
            config.simulation.mode = RunMode::Headless;
        }
        if self.dashboard {
            config.simulation.mode = RunMode::Dashboard;
        }
        if self.random_seed {
            config.source.seed = None;
        }
        if let Some(seed) = self.seed {
            config.source.seed = Some(seed);
        }
        if let Some(steps) = self.steps {
            config.simulation.steps = steps;
        }
        if let Some(vocabulary_size) = self.vocabulary_size {
            config.source.vocabulary_size = vocabulary_size;
        }
        if let Some(exponent) = self.exponent {
            config.source.power_law_exponent = exponent;
        }
        if let Some(interval) = self.step_interval_ms {
            config.simulation.step_interval_ms = interval;
        }
        if let Some(port) = self.port {
            config.observer.port = port;
        }
        if self.json_logs {
            config.logging.json = true;
        }
    }
}
