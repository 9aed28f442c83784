//! Per-partition history tables and the append-only merge.

use std::collections::{BTreeMap, BTreeSet};

use forecast_common::Period;

use crate::aggregator::StatRow;
use crate::partition::Partition;

/// Existing rows followed by new rows, both in their original order.
///
/// Never deduplicates: coverage tracking keeps already-covered periods from
/// being requested again, so new rows never repeat history.
pub fn merge(existing: Vec<StatRow>, new_rows: Vec<StatRow>) -> Vec<StatRow> {
    if existing.is_empty() {
        return new_rows;
    }
    let mut merged = existing;
    merged.extend(new_rows);
    merged
}

/// Every partition's current table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    tables: BTreeMap<Partition, Vec<StatRow>>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `new_rows` to a partition, returning the extended history.
    pub fn merge(mut self, partition: Partition, new_rows: Vec<StatRow>) -> Self {
        let existing = self.tables.remove(&partition).unwrap_or_default();
        let merged = merge(existing, new_rows);
        if !merged.is_empty() {
            self.tables.insert(partition, merged);
        }
        self
    }

    pub fn merge_all(self, routed: BTreeMap<Partition, Vec<StatRow>>) -> Self {
        routed
            .into_iter()
            .fold(self, |history, (partition, rows)| history.merge(partition, rows))
    }

    pub fn table(&self, partition: &Partition) -> Option<&[StatRow]> {
        self.tables.get(partition).map(|rows| rows.as_slice())
    }

    pub fn partitions(&self) -> impl Iterator<Item = &Partition> {
        self.tables.keys()
    }

    pub fn tables(&self) -> impl Iterator<Item = (&Partition, &[StatRow])> {
        self.tables.iter().map(|(p, rows)| (p, rows.as_slice()))
    }

    /// Issue periods present in the reference (`adm0`) partition.
    pub fn known_periods(&self) -> BTreeSet<Period> {
        self.table(&Partition::Admin0All)
            .unwrap_or_default()
            .iter()
            .map(|row| row.issue)
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.tables.values().map(|rows| rows.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
