//! Append-only record of every completed simulation step.
//!
//! The store has a single writer (the [`SimulationClock`]) and hands out
//! read-only views. Records are never removed or modified; a record's
//! position in the store always equals its `step` field.
//!
//! [`SimulationClock`]: crate::clock::SimulationClock

use cogmetrics_types::MetricRecord;

/// Ordered, append-only sequence of [`MetricRecord`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryStore {
    records: Vec<MetricRecord>,
}

impl HistoryStore {
    /// Create an empty store.
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Append a record. Amortized O(1).
    pub(crate) fn append(&mut self, record: MetricRecord) {
        self.records.push(record);
    }

    /// The most recent record, or `None` if no step has run yet.
    pub fn latest(&self) -> Option<&MetricRecord> {
        self.records.last()
    }

    /// The record for a given step, if it has been recorded.
    pub fn get(&self, step: u64) -> Option<&MetricRecord> {
        usize::try_from(step)
            .ok()
            .and_then(|idx| self.records.get(idx))
    }

    /// Ordered read-only iteration over all records.
    pub fn iter(&self) -> std::slice::Iter<'_, MetricRecord> {
        self.records.iter()
    }

    /// All records as a slice.
    pub fn as_slice(&self) -> &[MetricRecord] {
        &self.records
    }

    /// Records from `step` onward; empty if `step` is past the end.
    pub fn since(&self, step: u64) -> &[MetricRecord] {
        let start = usize::try_from(step)
            .unwrap_or(usize::MAX)
            .min(self.records.len());
        self.records.get(start..).unwrap_or_default()
    }

    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no step has been recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Consume the store, returning the records.
    pub fn into_records(self) -> Vec<MetricRecord> {
        self.records
    }
}

impl<'a> IntoIterator for &'a HistoryStore {
    type Item = &'a MetricRecord;
    type IntoIter = std::slice::Iter<'a, MetricRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cogmetrics_types::{MetricValues, TokenId};

    use super::*;

    fn record(step: u64) -> MetricRecord {
        MetricRecord::new(step, MetricValues::default(), TokenId(0), vec![0.5, 0.5])
    }

    #[test]
    fn empty_store_signals_absence() {
        let store = HistoryStore::new();
        assert!(store.is_empty());
        assert!(store.latest().is_none());
        assert!(store.get(0).is_none());
        assert!(store.since(0).is_empty());
    }

    #[test]
    fn append_preserves_order() {
        let mut store = HistoryStore::new();
        for step in 0..5 {
            store.append(record(step));
        }
        assert_eq!(store.len(), 5);
        assert_eq!(store.latest().unwrap().step, 4);
        assert_eq!(store.get(2).unwrap().step, 2);
        let steps: Vec<u64> = store.iter().map(|r| r.step).collect();
        assert_eq!(steps, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn since_returns_tail() {
        let mut store = HistoryStore::new();
        for step in 0..5 {
            store.append(record(step));
        }
        assert_eq!(store.since(3).len(), 2);
        assert!(store.since(99).is_empty());
    }
}
