//! Tracks which issue periods are already represented in history.

use std::collections::BTreeSet;

use forecast_common::{Period, PeriodRange};

/// The set of issue periods already covered.
///
/// Seeded once from recovered history; only grows during a run, when a
/// retrieval succeeds for some months.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coverage {
    known: BTreeSet<Period>,
}

impl Coverage {
    pub fn new(known: impl IntoIterator<Item = Period>) -> Self {
        Self {
            known: known.into_iter().collect(),
        }
    }

    pub fn is_covered(&self, period: &Period) -> bool {
        self.known.contains(period)
    }

    /// Periods in `range` not yet covered, in chronological order.
    pub fn missing_periods(&self, range: PeriodRange) -> BTreeSet<Period> {
        range.iter().filter(|p| !self.is_covered(p)).collect()
    }

    pub fn mark_covered(&mut self, periods: impl IntoIterator<Item = Period>) {
        self.known.extend(periods);
    }

    pub fn known(&self) -> &BTreeSet<Period> {
        &self.known
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}
