//! Observer API server for the cognitive metrics simulation.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws/records`) streaming each recorded
//!   step via [`tokio::sync::broadcast`]
//! - **REST endpoints** for the run status, history, latest record, and
//!   the time series, phase space, heatmap, and summary projections
//! - **Minimal HTML dashboard** (`GET /`) showing the latest metric
//!   values and links to the API
//!
//! # Architecture
//!
//! The observer reads from an in-memory [`ObserverSnapshot`] that the
//! engine mirrors from the clock's history after every step. Mirroring
//! never blocks the step loop: a contended lock is skipped and the
//! missing records are caught up on the next step.
//!
//! [`ObserverSnapshot`]: state::ObserverSnapshot

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::{AppState, ObserverSnapshot, RecordBroadcast};
