//! Reporting periods and report subjects.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Who a monthly report is about.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ReportSubject {
    Patient(i64),
    Hygienist(i64),
}

impl ReportSubject {
    pub fn id(&self) -> i64 {
        match self {
            ReportSubject::Patient(id) | ReportSubject::Hygienist(id) => *id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ReportSubject::Patient(_) => "patient",
            ReportSubject::Hygienist(_) => "hygienist",
        }
    }
}

impl fmt::Display for ReportSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid reporting period: {year}-{month:02}")]
pub struct InvalidPeriod {
    pub year: i32,
    pub month: u32,
}

/// A calendar month.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MonthPeriod {
    pub year: i32,
    pub month: u32,
}

impl MonthPeriod {
    pub fn new(year: i32, month: u32) -> Result<Self, InvalidPeriod> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(|_| Self { year, month })
            .ok_or(InvalidPeriod { year, month })
    }

    /// The month containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// First day of the following month (exclusive upper bound).
    pub fn next_first_day(&self) -> NaiveDate {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MAX)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for MonthPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// A stored visit row that could not be interpreted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntegrityIssue {
    pub visit_id: i64,
    pub problem: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_bounds() {
        let period = MonthPeriod::new(2024, 12).unwrap();
        assert_eq!(period.first_day(), NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        assert_eq!(
            period.next_first_day(),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
        );
        assert_eq!(period.to_string(), "2024-12");
    }

    #[test]
    fn test_invalid_month() {
        assert_eq!(
            MonthPeriod::new(2024, 13),
            Err(InvalidPeriod {
                year: 2024,
                month: 13
            })
        );
        assert!(MonthPeriod::new(2024, 0).is_err());
    }

    #[test]
    fn test_contains() {
        let period = MonthPeriod::new(2024, 2).unwrap();
        assert!(period.contains(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()));
        assert!(!period.contains(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));
        assert!(!period.contains(NaiveDate::from_ymd_opt(2023, 2, 1).unwrap()));
    }

    #[test]
    fn test_subject_serde() {
        let json = serde_json::to_string(&ReportSubject::Hygienist(3)).unwrap();
        assert_eq!(json, r#"{"kind":"hygienist","id":3}"#);
    }
}
