//! Engine binary for the emergent cognitive metrics simulation.
//!
//! Loads configuration, builds the simulation clock, and runs it either
//! headless (print the final metrics and exit) or behind the live
//! observer dashboard.
//!
//! # Startup Sequence
//!
//! 1. Parse command-line flags
//! 2. Load configuration from `cogmetrics-config.yaml` and apply overrides
//! 3. Initialize structured logging (tracing)
//! 4. Validate configuration and create the simulation clock
//! 5. Run headless, or spawn the observer and run paced
//! 6. Export history if requested and log the result

mod cli;
mod error;
mod observer_callback;
mod report;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use cogmetrics_core::clock::SimulationClock;
use cogmetrics_core::config::{LoggingConfig, SimulationConfig};
use cogmetrics_core::export;
use cogmetrics_core::runner::{self, NoOpCallback, SimulationResult};
use cogmetrics_observer::server::ServerConfig;
use cogmetrics_observer::startup::spawn_observer;
use cogmetrics_observer::state::AppState;
use cogmetrics_types::{RunMode, RunStatus};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Args, DEFAULT_CONFIG_PATH};
use crate::error::EngineError;
use crate::observer_callback::ObserverCallback;

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the observer cannot
/// start, or the run or export fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1-2. Flags and configuration.
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    args.apply(&mut config);

    // 3. Logging.
    init_tracing(&config.logging);
    info!("cogmetrics-engine starting");
    info!(
        vocabulary_size = config.source.vocabulary_size,
        exponent = config.source.power_law_exponent,
        seed = ?config.source.seed,
        steps = config.simulation.steps,
        mode = ?config.simulation.mode,
        "Configuration loaded"
    );

    // 4. Clock.
    let mut clock = SimulationClock::new(&config).map_err(EngineError::from)?;
    let steps = config.simulation.steps;

    // 5. Run.
    let result = match config.simulation.mode {
        RunMode::Headless => run_headless(&mut clock, steps)?,
        RunMode::Dashboard => run_dashboard(&mut clock, &config).await?,
    };

    // 6. Export and report.
    if let Some(ref path) = args.export {
        export_history(&clock, path)?;
    }
    runner::log_simulation_end(&result);

    info!(
        status = ?result.status,
        total_steps = result.total_steps,
        seed = clock.seed(),
        "cogmetrics-engine shutdown complete"
    );

    Ok(())
}

/// Load the simulation configuration.
///
/// An explicit path must exist. Without one, `cogmetrics-config.yaml` in
/// the working directory is used if present, otherwise the defaults.
/// Environment overrides apply in both cases.
fn load_config(path: Option<&Path>) -> Result<SimulationConfig, EngineError> {
    if let Some(path) = path {
        return Ok(SimulationConfig::from_file(path)?);
    }

    let default_path = Path::new(DEFAULT_CONFIG_PATH);
    if default_path.exists() {
        Ok(SimulationConfig::from_file(default_path)?)
    } else {
        let mut config = SimulationConfig::default();
        config.apply_env_overrides()?;
        Ok(config)
    }
}

/// Install the tracing subscriber. `RUST_LOG` takes precedence over the
/// configured level. Logs go to stderr so the headless report owns stdout.
fn init_tracing(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Run every step back to back and print the report.
fn run_headless(
    clock: &mut SimulationClock,
    steps: u64,
) -> Result<SimulationResult, EngineError> {
    let result = runner::run_to_completion(clock, steps, &mut NoOpCallback)?;
    print!("{}", report::render(&result, clock.seed()));
    Ok(result)
}

/// Serve the observer and run paced steps until done or interrupted.
///
/// Falls back to a headless run if the observer cannot bind. After a
/// completed run the observer keeps serving until Ctrl-C.
async fn run_dashboard(
    clock: &mut SimulationClock,
    config: &SimulationConfig,
) -> Result<SimulationResult, EngineError> {
    let state = Arc::new(AppState::new());
    let (server, addr) =
        match spawn_observer(&ServerConfig::from(&config.observer), Arc::clone(&state)).await {
            Ok(spawned) => spawned,
            Err(e) => {
                warn!(error = %e, "Observer unavailable, falling back to headless run");
                return run_headless(clock, config.simulation.steps);
            }
        };
    info!(%addr, "Observer API server started");

    state
        .begin_run(clock.run_info().clone(), clock.table().snapshot())
        .await;

    let mut callback = ObserverCallback::new(Arc::clone(&state));
    let interval = Duration::from_millis(config.simulation.step_interval_ms);

    let status = tokio::select! {
        outcome = runner::run_simulation(clock, config.simulation.steps, interval, &mut callback) => {
            outcome?;
            RunStatus::Completed
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping run");
            RunStatus::Cancelled
        }
    };

    state.finish_run(clock.history().as_slice(), status).await;
    let result = SimulationResult::from_history(clock.history(), status);

    if status == RunStatus::Completed {
        info!(%addr, "Run complete, observer still serving (Ctrl-C to exit)");
        tokio::signal::ctrl_c().await?;
    }

    server.abort();
    Ok(result)
}

/// Write the clock's history as JSON lines.
fn export_history(clock: &SimulationClock, path: &Path) -> Result<(), EngineError> {
    let mut writer = BufWriter::new(File::create(path)?);
    let written = export::write_jsonl(&mut writer, clock.history())?;
    info!(path = %path.display(), records = written, "History exported");
    Ok(())
}
