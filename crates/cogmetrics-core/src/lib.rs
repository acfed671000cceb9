//! Token source, metric engine, simulation clock, and history for the
//! emergent cognitive metrics simulation.
//!
//! This crate owns the linear pipeline that drives the simulation:
//! draw a token, fold it into the metric engine, record the result.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `cogmetrics-config.yaml` into
//!   strongly-typed structs, plus eager validation.
//! - [`token`] -- Power-law probability table and seeded token source.
//! - [`metrics`] -- The metric engine computing logic, aesthetic,
//!   understanding, and utility.
//! - [`clock`] -- The step loop and its lazy record iterator.
//! - [`history`] -- Append-only record store.
//! - [`views`] -- Time series, phase space, heatmap, and summary projections.
//! - [`export`] -- JSON-lines history export.
//! - [`runner`] -- Paced async runner and headless runner with callbacks.

pub mod clock;
pub mod config;
pub mod export;
pub mod history;
pub mod metrics;
pub mod runner;
pub mod token;
pub mod views;
