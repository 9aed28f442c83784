//! Decoded grid container.

use std::collections::{BTreeMap, BTreeSet};

use forecast_common::{LeadTime, Period};

use crate::error::{DecodeError, DecodeResult};

/// Source-native units of the decoded fields (an accumulation rate).
pub const RATE_UNITS: &str = "m s**-1";

/// Fields of one grid file, indexed by (issue period, lead step).
///
/// Values are row-major over (latitude, longitude) in axis order.
#[derive(Debug, Clone)]
pub struct DecodedGrid {
    pub latitudes: Vec<f64>,
    pub longitudes: Vec<f64>,
    pub units: String,
    fields: BTreeMap<(Period, u8), Vec<f32>>,
}

impl DecodedGrid {
    pub fn new(latitudes: Vec<f64>, longitudes: Vec<f64>) -> Self {
        Self {
            latitudes,
            longitudes,
            units: RATE_UNITS.to_string(),
            fields: BTreeMap::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.longitudes.len()
    }

    pub fn height(&self) -> usize {
        self.latitudes.len()
    }

    /// Add the field for one issue period and 1-indexed lead step.
    pub fn insert(&mut self, issue: Period, step: u8, values: Vec<f32>) -> DecodeResult<()> {
        LeadTime::from_step(step)?;

        let expected = self.width() * self.height();
        if values.len() != expected {
            return Err(DecodeError::FieldSize {
                expected,
                actual: values.len(),
            });
        }
        if self.fields.contains_key(&(issue, step)) {
            return Err(DecodeError::DuplicateField { issue, step });
        }

        self.fields.insert((issue, step), values);
        Ok(())
    }

    pub fn field(&self, issue: Period, step: u8) -> Option<&[f32]> {
        self.fields.get(&(issue, step)).map(|v| v.as_slice())
    }

    pub fn issue_periods(&self) -> BTreeSet<Period> {
        self.fields.keys().map(|(issue, _)| *issue).collect()
    }

    /// Lead steps present for an issue period, ascending.
    pub fn lead_steps(&self, issue: Period) -> Vec<u8> {
        self.fields
            .keys()
            .filter(|(p, _)| *p == issue)
            .map(|(_, step)| *step)
            .collect()
    }

    /// Iterate fields in (issue, step) order.
    pub fn fields(&self) -> impl Iterator<Item = (Period, u8, &[f32])> {
        self.fields
            .iter()
            .map(|((issue, step), values)| (*issue, *step, values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period(year: i32, month: u32) -> Period {
        Period::new(year, month).unwrap()
    }

    #[test]
    fn test_insert_validates_size() {
        let mut grid = DecodedGrid::new(vec![1.0, 0.0], vec![0.0, 1.0, 2.0]);
        assert!(grid.insert(period(2025, 3), 1, vec![0.0; 6]).is_ok());

        let result = grid.insert(period(2025, 3), 2, vec![0.0; 5]);
        assert!(matches!(
            result,
            Err(DecodeError::FieldSize {
                expected: 6,
                actual: 5
            })
        ));
    }

    #[test]
    fn test_insert_rejects_duplicates_and_bad_steps() {
        let mut grid = DecodedGrid::new(vec![0.0], vec![0.0]);
        grid.insert(period(2025, 3), 1, vec![1.0]).unwrap();

        assert!(matches!(
            grid.insert(period(2025, 3), 1, vec![2.0]),
            Err(DecodeError::DuplicateField { step: 1, .. })
        ));
        assert!(grid.insert(period(2025, 3), 7, vec![2.0]).is_err());
        assert!(grid.insert(period(2025, 3), 0, vec![2.0]).is_err());
    }

    #[test]
    fn test_issue_periods_and_steps() {
        let mut grid = DecodedGrid::new(vec![0.0], vec![0.0]);
        grid.insert(period(2025, 2), 2, vec![1.0]).unwrap();
        grid.insert(period(2025, 2), 1, vec![1.0]).unwrap();
        grid.insert(period(2025, 1), 1, vec![1.0]).unwrap();

        let issues: Vec<Period> = grid.issue_periods().into_iter().collect();
        assert_eq!(issues, vec![period(2025, 1), period(2025, 2)]);
        assert_eq!(grid.lead_steps(period(2025, 2)), vec![1, 2]);
        assert_eq!(grid.len(), 3);
    }
}
