//! Plain-text run report printed at the end of a headless run.

use cogmetrics_core::runner::SimulationResult;
use cogmetrics_types::MetricKind;

/// Render the final metrics, the per-metric summary, and the seed.
///
/// Values are printed with four decimals.
pub fn render(result: &SimulationResult, seed: u64) -> String {
    let mut out = String::new();

    if let Some(ref record) = result.final_record {
        out.push_str("Final Metrics:\n");
        for kind in MetricKind::ALL {
            out.push_str(&format!("{}: {:.4}\n", kind.label(), record.metric(kind)));
        }
    } else {
        out.push_str("No steps recorded.\n");
    }

    if let Some(ref summary) = result.summary {
        out.push_str(&format!("\nSummary over {} steps:\n", summary.steps));
        out.push_str(&format!(
            "{:<14}{:>8}{:>8}{:>8}{:>8}\n",
            "metric", "mean", "min", "max", "last"
        ));
        for kind in MetricKind::ALL {
            let stats = summary.get(kind);
            out.push_str(&format!(
                "{:<14}{:>8.4}{:>8.4}{:>8.4}{:>8.4}\n",
                kind.label(),
                stats.mean,
                stats.min,
                stats.max,
                stats.last
            ));
        }
    }

    out.push_str(&format!("\nSeed: {seed}\n"));
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cogmetrics_core::clock::SimulationClock;
    use cogmetrics_core::config::SimulationConfig;
    use cogmetrics_core::runner::{self, NoOpCallback};
    use cogmetrics_types::RunStatus;

    use super::*;

    #[test]
    fn report_lists_final_metrics_and_seed() {
        let mut clock = SimulationClock::new(&SimulationConfig::default()).unwrap();
        let result = runner::run_to_completion(&mut clock, 150, &mut NoOpCallback).unwrap();
        let text = render(&result, clock.seed());

        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Final Metrics:"));
        let logic = lines.next().unwrap();
        assert!(logic.starts_with("Logic: "));
        let value = logic.trim_start_matches("Logic: ");
        assert_eq!(value.split('.').nth(1).unwrap().len(), 4);
        assert!(text.contains("Understanding: "));
        assert!(text.contains("Summary over 150 steps:"));
        assert!(text.ends_with("Seed: 42\n"));
    }

    #[test]
    fn summary_table_has_one_row_per_metric() {
        let mut clock = SimulationClock::new(&SimulationConfig::default()).unwrap();
        let result = runner::run_to_completion(&mut clock, 20, &mut NoOpCallback).unwrap();
        let text = render(&result, clock.seed());

        let table: Vec<&str> = text
            .lines()
            .skip_while(|line| !line.starts_with("metric"))
            .skip(1)
            .take_while(|line| !line.is_empty())
            .collect();
        assert_eq!(table.len(), 4);
        assert!(table.iter().zip(MetricKind::ALL).all(|(row, kind)| row.starts_with(kind.label())));
    }

    #[test]
    fn report_for_empty_run() {
        let clock = SimulationClock::new(&SimulationConfig::default()).unwrap();
        let result = SimulationResult::from_history(clock.history(), RunStatus::Cancelled);
        let text = render(&result, 42);
        assert!(text.starts_with("No steps recorded."));
        assert!(!text.contains("Summary"));
    }
}
