//! Shared type definitions for the emergent cognitive metrics simulation.
//!
//! This crate is the single source of truth for the values that flow out of
//! the engine. Types defined here flow downstream to `TypeScript` via
//! `ts-rs` for dashboard clients of the observer API.
//!
//! # Modules
//!
//! - [`ids`] -- Run and token identifiers
//! - [`enums`] -- Metric kinds, run modes, run status
//! - [`structs`] -- Per-step records, summaries, and dashboard projections

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{MetricKind, RunMode, RunStatus};
pub use ids::{RunId, TokenId};
pub use structs::{
    Heatmap, HeatmapBucket, MetricRecord, MetricStats, MetricSummary, MetricValues, PhasePoint,
    RunInfo, TimeSeries,
};

#[cfg(test)]
mod tests {
    //! Binding generation for dashboard clients.

    #[test]
    fn export_bindings() {
        // ts-rs writes TypeScript definitions for every #[ts(export)] type
        // into the `bindings/` directory relative to the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::RunId::export_all();
        let _ = crate::ids::TokenId::export_all();

        // Enums
        let _ = crate::enums::MetricKind::export_all();
        let _ = crate::enums::RunMode::export_all();
        let _ = crate::enums::RunStatus::export_all();

        // Structs
        let _ = crate::structs::MetricValues::export_all();
        let _ = crate::structs::MetricRecord::export_all();
        let _ = crate::structs::MetricStats::export_all();
        let _ = crate::structs::MetricSummary::export_all();
        let _ = crate::structs::TimeSeries::export_all();
        let _ = crate::structs::PhasePoint::export_all();
        let _ = crate::structs::HeatmapBucket::export_all();
        let _ = crate::structs::Heatmap::export_all();
        let _ = crate::structs::RunInfo::export_all();
    }
}
