//! Issue/valid periods and forecast lead times.
//!
//! Seasonal forecasts are issued once a month, so the natural time unit is a
//! (year, month) pair rather than a timestamp.

use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::str::FromStr;

use crate::error::{CommonError, CommonResult};

/// Lead-time steps as stored in the source archive (1-indexed months).
pub const LEAD_TIME_STEPS: [u8; 6] = [1, 2, 3, 4, 5, 6];

/// A calendar month identifying when a forecast was issued or is valid.
///
/// Ordered chronologically; formatted as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> CommonResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(CommonError::InvalidPeriod(format!("{}-{}", year, month)));
        }
        Ok(Self { year, month })
    }

    /// The period containing a calendar date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Shift by a (possibly negative) number of months.
    pub fn add_months(self, months: i32) -> Self {
        let index = self.ordinal() + months;
        Self {
            year: index.div_euclid(12),
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    /// Number of months from `earlier` to `self`.
    pub fn months_since(&self, earlier: Period) -> i32 {
        self.ordinal() - earlier.ordinal()
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        self.add_months(1)
            .first_day()
            .pred_opt()
            .unwrap_or(NaiveDate::MIN)
    }

    pub fn days_in_month(&self) -> u32 {
        self.last_day().day()
    }

    fn ordinal(&self) -> i32 {
        self.year * 12 + self.month as i32 - 1
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = CommonError;

    /// Parse `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CommonError::InvalidPeriod(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Period::new(year, month)
    }
}

/// Inclusive range of periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodRange {
    pub start: Period,
    pub end: Period,
}

impl PeriodRange {
    pub fn new(start: Period, end: Period) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, period: &Period) -> bool {
        period >= &self.start && period <= &self.end
    }

    /// Periods in chronological order. Empty when `start > end`.
    pub fn iter(&self) -> impl Iterator<Item = Period> {
        let start = self.start;
        let count = (self.end.months_since(self.start) + 1).max(0);
        (0..count).map(move |offset| start.add_months(offset))
    }

    pub fn len(&self) -> usize {
        (self.end.months_since(self.start) + 1).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Months between an issue period and the period the forecast applies to.
///
/// Normalized to 0-5; the source archive stores it as a 1-6 step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LeadTime(u8);

impl LeadTime {
    pub const MAX: u8 = 5;

    pub fn new(months: u8) -> CommonResult<Self> {
        if months > Self::MAX {
            return Err(CommonError::InvalidLeadTime(months));
        }
        Ok(Self(months))
    }

    /// Convert a 1-indexed source step into a lead time.
    pub fn from_step(step: u8) -> CommonResult<Self> {
        if !(1..=Self::MAX + 1).contains(&step) {
            return Err(CommonError::InvalidLeadStep(step));
        }
        Ok(Self(step - 1))
    }

    pub fn months(&self) -> u8 {
        self.0
    }

    /// The 1-indexed source step.
    pub fn step(&self) -> u8 {
        self.0 + 1
    }

    /// Period the forecast applies to.
    pub fn valid_period(&self, issue: Period) -> Period {
        issue.add_months(self.0 as i32)
    }
}

impl fmt::Display for LeadTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
