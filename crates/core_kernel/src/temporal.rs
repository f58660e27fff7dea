//! Billing calendar types
//!
//! This module provides the billing-period representation and the date
//! helpers used when issuing bills: periods are calendar months labelled
//! `YYYY-MM`, and due dates fall one calendar month after the bill date.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors related to billing calendar operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid billing period: {0}")]
    InvalidPeriod(String),

    #[error("Invalid month: {0} (must be 1-12)")]
    InvalidMonth(u32),

    #[error("Date arithmetic overflow for {0}")]
    DateOverflow(NaiveDate),
}

/// A calendar-month billing period
///
/// Bills are issued against the month the reading was taken in. The
/// canonical label is `YYYY-MM`; bill numbers embed the compact `YYYYMM`
/// form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BillingPeriod {
    year: i32,
    month: u32,
}

impl BillingPeriod {
    /// Creates a period from a year and month
    pub fn new(year: i32, month: u32) -> Result<Self, TemporalError> {
        if !(1..=12).contains(&month) {
            return Err(TemporalError::InvalidMonth(month));
        }
        Ok(Self { year, month })
    }

    /// Derives the period from a reading date
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Returns the year
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Returns the month (1-12)
    pub fn month(&self) -> u32 {
        self.month
    }

    /// Canonical `YYYY-MM` label
    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    /// Compact `YYYYMM` form used in bill numbers
    pub fn compact(&self) -> String {
        format!("{:04}{:02}", self.year, self.month)
    }

    /// The period immediately after this one
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for BillingPeriod {
    type Err = TemporalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| TemporalError::InvalidPeriod(s.to_string()))?;
        let year: i32 = year
            .parse()
            .map_err(|_| TemporalError::InvalidPeriod(s.to_string()))?;
        let month: u32 = month
            .parse()
            .map_err(|_| TemporalError::InvalidPeriod(s.to_string()))?;
        Self::new(year, month)
    }
}

/// Returns the date one calendar month after the given date
///
/// Day-of-month is clamped: a bill issued 31 Jan falls due 28/29 Feb.
pub fn one_month_after(date: NaiveDate) -> Result<NaiveDate, TemporalError> {
    date.checked_add_months(Months::new(1))
        .ok_or(TemporalError::DateOverflow(date))
}

/// Formats a date as `DD Mon YYYY` (e.g. `05 Aug 2026`)
///
/// This is the human-readable due-date format used in customer
/// notifications.
pub fn format_day_month_year(date: NaiveDate) -> String {
    date.format("%d %b %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_label() {
        let period = BillingPeriod::new(2026, 8).unwrap();
        assert_eq!(period.label(), "2026-08");
        assert_eq!(period.compact(), "202608");
    }

    #[test]
    fn test_period_from_date() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();
        let period = BillingPeriod::from_date(date);
        assert_eq!(period.label(), "2026-08");
    }

    #[test]
    fn test_period_rejects_invalid_month() {
        assert_eq!(
            BillingPeriod::new(2026, 13),
            Err(TemporalError::InvalidMonth(13))
        );
    }

    #[test]
    fn test_period_next_wraps_year() {
        let december = BillingPeriod::new(2026, 12).unwrap();
        assert_eq!(december.next().label(), "2027-01");
    }

    #[test]
    fn test_period_parse_roundtrip() {
        let period: BillingPeriod = "2026-08".parse().unwrap();
        assert_eq!(period, BillingPeriod::new(2026, 8).unwrap());
    }

    #[test]
    fn test_one_month_after_clamps_day() {
        let jan31 = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        assert_eq!(
            one_month_after(jan31).unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 28).unwrap()
        );
    }

    #[test]
    fn test_format_day_month_year() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();
        assert_eq!(format_day_month_year(date), "05 Aug 2026");
    }
}
