//! Read-only projections of recorded history for dashboards and summaries.
//!
//! Every function takes a slice of records (typically
//! [`HistoryStore::as_slice`](crate::history::HistoryStore::as_slice)) so
//! callers can snapshot once and project many times while the run keeps
//! growing.

use cogmetrics_types::{
    Heatmap, HeatmapBucket, MetricKind, MetricRecord, MetricStats, MetricSummary, PhasePoint,
    TimeSeries,
};

/// Extract one metric over time.
pub fn time_series(records: &[MetricRecord], metric: MetricKind) -> TimeSeries {
    let (steps, values) = records.iter().map(|r| (r.step, r.metric(metric))).unzip();
    TimeSeries {
        metric,
        steps,
        values,
    }
}

/// The logic-versus-aesthetic trajectory, weighted by understanding.
pub fn phase_space(records: &[MetricRecord]) -> Vec<PhasePoint> {
    records
        .iter()
        .map(|r| PhasePoint {
            step: r.step,
            logic: r.logic,
            aesthetic: r.aesthetic,
            understanding: r.understanding,
        })
        .collect()
}

/// Build a probability heatmap with at most `max_buckets` columns.
///
/// The `expected` row is the probability snapshot of the latest record.
/// Each bucket holds the fraction of its draws that hit each token, so a
/// bucket's frequencies sum to 1. Records are split into contiguous
/// buckets of `ceil(len / max_buckets)` steps. Returns `None` for an empty
/// history.
#[allow(clippy::cast_precision_loss)]
pub fn heatmap(records: &[MetricRecord], max_buckets: usize) -> Option<Heatmap> {
    let latest = records.last()?;
    let vocabulary_size = latest.probabilities.len();
    let bucket_len = records.len().div_ceil(max_buckets.max(1)).max(1);

    let buckets = records
        .chunks(bucket_len)
        .filter_map(|chunk| {
            let first = chunk.first()?;
            let last = chunk.last()?;
            let mut counts = vec![0_u64; vocabulary_size];
            for record in chunk {
                if let Some(count) = counts.get_mut(record.token.index()) {
                    *count = count.saturating_add(1);
                }
            }
            let total = chunk.len() as f64;
            Some(HeatmapBucket {
                start_step: first.step,
                end_step: last.step,
                frequencies: counts.into_iter().map(|c| c as f64 / total).collect(),
            })
        })
        .collect();

    Some(Heatmap {
        vocabulary_size: u32::try_from(vocabulary_size).unwrap_or(u32::MAX),
        expected: latest.probabilities.clone(),
        buckets,
    })
}

/// Reduce history to mean / last / min / max per metric.
///
/// Returns `None` for an empty history.
pub fn summarize(records: &[MetricRecord]) -> Option<MetricSummary> {
    let stats = |metric| stats_for(records, metric);
    Some(MetricSummary {
        steps: u64::try_from(records.len()).unwrap_or(u64::MAX),
        logic: stats(MetricKind::Logic)?,
        aesthetic: stats(MetricKind::Aesthetic)?,
        understanding: stats(MetricKind::Understanding)?,
        utility: stats(MetricKind::Utility)?,
    })
}

#[allow(clippy::cast_precision_loss)]
fn stats_for(records: &[MetricRecord], metric: MetricKind) -> Option<MetricStats> {
    let last = records.last()?.metric(metric);
    let (sum, min, max) = records.iter().map(|r| r.metric(metric)).fold(
        (0.0, f64::INFINITY, f64::NEG_INFINITY),
        |(sum, min, max), v| (sum + v, min.min(v), max.max(v)),
    );
    Some(MetricStats {
        mean: sum / records.len() as f64,
        last,
        min,
        max,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::indexing_slicing)]
mod tests {
    use cogmetrics_types::{MetricValues, TokenId};

    use super::*;

    fn record(step: u64, token: u32, logic: f64, aesthetic: f64) -> MetricRecord {
        MetricRecord::new(
            step,
            MetricValues {
                logic,
                aesthetic,
                understanding: crate::metrics::harmonic_mean(logic, aesthetic),
                utility: logic / 2.0,
            },
            TokenId(token),
            vec![0.5, 0.3, 0.2],
        )
    }

    fn sample() -> Vec<MetricRecord> {
        vec![
            record(0, 0, 0.2, 0.0),
            record(1, 0, 0.4, 0.5),
            record(2, 1, 0.6, 0.5),
            record(3, 2, 0.8, 1.0),
        ]
    }

    #[test]
    fn time_series_is_parallel() {
        let series = time_series(&sample(), MetricKind::Logic);
        assert_eq!(series.metric, MetricKind::Logic);
        assert_eq!(series.steps, vec![0, 1, 2, 3]);
        assert_eq!(series.values, vec![0.2, 0.4, 0.6, 0.8]);
    }

    #[test]
    fn phase_space_tracks_logic_and_aesthetic() {
        let points = phase_space(&sample());
        assert_eq!(points.len(), 4);
        assert_eq!(points[3].logic, 0.8);
        assert_eq!(points[3].aesthetic, 1.0);
        assert_eq!(points[0].understanding, 0.0);
    }

    #[test]
    fn heatmap_buckets_sum_to_one() {
        let map = heatmap(&sample(), 2).unwrap();
        assert_eq!(map.vocabulary_size, 3);
        assert_eq!(map.expected, vec![0.5, 0.3, 0.2]);
        assert_eq!(map.buckets.len(), 2);
        assert_eq!(map.buckets[0].start_step, 0);
        assert_eq!(map.buckets[0].end_step, 1);
        assert_eq!(map.buckets[0].frequencies, vec![1.0, 0.0, 0.0]);
        assert_eq!(map.buckets[1].frequencies, vec![0.0, 0.5, 0.5]);
        for bucket in &map.buckets {
            let sum: f64 = bucket.frequencies.iter().sum();
            assert!((sum - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn heatmap_caps_bucket_count() {
        let records: Vec<_> = (0..10).map(|s| record(s, 0, 0.5, 0.5)).collect();
        assert_eq!(heatmap(&records, 3).unwrap().buckets.len(), 3);
        assert_eq!(heatmap(&records, 100).unwrap().buckets.len(), 10);
        assert_eq!(heatmap(&records, 0).unwrap().buckets.len(), 1);
        assert!(heatmap(&[], 10).is_none());
    }

    #[test]
    fn summary_reduces_each_metric() {
        let summary = summarize(&sample()).unwrap();
        assert_eq!(summary.steps, 4);
        assert!((summary.logic.mean - 0.5).abs() < 1e-12);
        assert_eq!(summary.logic.last, 0.8);
        assert_eq!(summary.logic.min, 0.2);
        assert_eq!(summary.logic.max, 0.8);
        assert_eq!(summary.aesthetic.min, 0.0);
        assert_eq!(summary.get(MetricKind::Utility).last, 0.4);
    }

    #[test]
    fn summary_of_empty_history_is_absent() {
        assert!(summarize(&[]).is_none());
    }
}
