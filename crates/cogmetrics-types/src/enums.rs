//! Enumeration types for the cognitive metrics simulation.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One of the four emergent metrics derived from the token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Fidelity-driven reasoning score.
    Logic,
    /// Entropy-driven diversity score.
    Aesthetic,
    /// Synthesis of logic and aesthetic.
    Understanding,
    /// Performance adjusted by an entropy penalty.
    Utility,
}

impl MetricKind {
    /// All metric kinds in display order.
    pub const ALL: [Self; 4] = [
        Self::Logic,
        Self::Aesthetic,
        Self::Understanding,
        Self::Utility,
    ];

    /// Human-readable label used in logs and headless output.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Logic => "Logic",
            Self::Aesthetic => "Aesthetic",
            Self::Understanding => "Understanding",
            Self::Utility => "Utility",
        }
    }
}

impl core::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

impl core::str::FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "logic" => Ok(Self::Logic),
            "aesthetic" => Ok(Self::Aesthetic),
            "understanding" => Ok(Self::Understanding),
            "utility" => Ok(Self::Utility),
            other => Err(format!("unknown metric: {other}")),
        }
    }
}

/// How the engine binary consumes the record stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Run every step immediately and print the final metrics.
    #[default]
    Headless,
    /// Pace the run and expose it through the observer API.
    Dashboard,
}

/// Lifecycle state of a run as reported to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Configuration accepted, no step recorded yet.
    #[default]
    Pending,
    /// Steps are being recorded.
    Running,
    /// All requested steps were recorded.
    Completed,
    /// The consumer stopped pulling before the requested step count.
    Cancelled,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn metric_kind_parses_case_insensitively() {
        assert_eq!("Logic".parse::<MetricKind>().unwrap(), MetricKind::Logic);
        assert_eq!("UTILITY".parse::<MetricKind>().unwrap(), MetricKind::Utility);
        assert!("beauty".parse::<MetricKind>().is_err());
    }

    #[test]
    fn metric_kind_serializes_snake_case() {
        let json = serde_json::to_string(&MetricKind::Understanding).unwrap();
        assert_eq!(json, "\"understanding\"");
    }

    #[test]
    fn run_mode_defaults_to_headless() {
        assert_eq!(RunMode::default(), RunMode::Headless);
        let mode: RunMode = serde_json::from_str("\"dashboard\"").unwrap();
        assert_eq!(mode, RunMode::Dashboard);
    }
}
