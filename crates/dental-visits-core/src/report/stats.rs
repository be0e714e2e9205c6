//! Pure visit statistics.

use serde::{Deserialize, Serialize};

use crate::models::{IntegrityIssue, MonthPeriod, ReportSubject, VisitRecord, VisitStatus};

/// Aggregates over a set of visit records.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VisitTotals {
    pub total_visits: u32,
    pub completed_visits: u32,
    pub cancelled_visits: u32,
    pub scheduled_visits: u32,
    /// Sum of computable durations, in hours
    pub total_hours: f64,
    /// Mean of computable durations, in minutes (0 when none)
    pub average_visit_duration: f64,
    /// How many records had a computable duration
    pub timed_visits: u32,
}

impl VisitTotals {
    /// Aggregate `records`. Records without both times, or with an end time
    /// not after the start time, count toward the status totals but not
    /// toward the durations.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a VisitRecord>,
    {
        let mut totals = Self::default();
        let mut total_minutes: i64 = 0;

        for record in records {
            totals.total_visits += 1;
            match record.status {
                VisitStatus::Completed => totals.completed_visits += 1,
                VisitStatus::Cancelled => totals.cancelled_visits += 1,
                VisitStatus::Scheduled => totals.scheduled_visits += 1,
            }
            if let Some(minutes) = record.duration_minutes() {
                total_minutes += minutes;
                totals.timed_visits += 1;
            }
        }

        totals.total_hours = total_minutes as f64 / 60.0;
        if totals.timed_visits > 0 {
            totals.average_visit_duration = total_minutes as f64 / totals.timed_visits as f64;
        }
        totals
    }

    pub fn count(&self, status: VisitStatus) -> u32 {
        match status {
            VisitStatus::Scheduled => self.scheduled_visits,
            VisitStatus::Completed => self.completed_visits,
            VisitStatus::Cancelled => self.cancelled_visits,
        }
    }
}

/// One visit as shown in a report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisitDetail {
    pub visit_id: i64,
    pub visit_date: String,
    pub patient_name: String,
    pub hygienist_name: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub status: VisitStatus,
    pub duration_minutes: Option<i64>,
    pub cancellation_reason: Option<String>,
    pub notes: Option<String>,
}

/// Monthly statistics for one patient or hygienist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyStats {
    pub subject: ReportSubject,
    pub subject_name: String,
    pub year: i32,
    pub month: u32,
    #[serde(flatten)]
    pub totals: VisitTotals,
    /// Ordered by date, then start time
    pub visits: Vec<VisitDetail>,
    pub integrity_issues: Vec<IntegrityIssue>,
}

impl MonthlyStats {
    pub fn period(&self) -> MonthPeriod {
        MonthPeriod {
            year: self.year,
            month: self.month,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// One row of a comparison report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntitySummary {
    pub id: i64,
    pub code: String,
    pub name: String,
    #[serde(flatten)]
    pub totals: VisitTotals,
}

/// Side-by-side monthly totals for every patient and every hygienist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonReport {
    pub year: i32,
    pub month: u32,
    /// Sorted by total visits, descending
    pub patients: Vec<EntitySummary>,
    /// Sorted by total visits, descending
    pub hygienists: Vec<EntitySummary>,
    pub integrity_issues: Vec<IntegrityIssue>,
}

impl ComparisonReport {
    pub fn period(&self) -> MonthPeriod {
        MonthPeriod {
            year: self.year,
            month: self.month,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Order summaries by total visits, most first. Ties go by ascending id.
pub fn rank_by_total_visits(summaries: &mut [EntitySummary]) {
    summaries.sort_by(|a, b| {
        b.totals
            .total_visits
            .cmp(&a.totals.total_visits)
            .then(a.id.cmp(&b.id))
    });
}
