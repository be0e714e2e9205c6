//! Monthly visit reports.
//!
//! Pipeline: store period query → [`VisitTotals`] aggregation → report rows
//!
//! Statistics are derived on each request; nothing is cached.

mod stats;

pub use stats::*;

use std::collections::HashMap;

use thiserror::Error;

use crate::db::Database;
use crate::models::{InvalidPeriod, MonthPeriod, ReportSubject, VisitRecord};

/// Report errors.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Database error: {0}")]
    Database(#[from] crate::db::DbError),

    #[error(transparent)]
    InvalidPeriod(#[from] InvalidPeriod),

    #[error("Unknown report subject: {0}")]
    UnknownSubject(ReportSubject),
}

pub type ReportResult<T> = Result<T, ReportError>;

/// Builds reports from the visit store.
pub struct ReportService<'a> {
    db: &'a Database,
}

impl<'a> ReportService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Statistics for one patient or hygienist in a month.
    pub fn monthly_stats(
        &self,
        subject: ReportSubject,
        year: i32,
        month: u32,
    ) -> ReportResult<MonthlyStats> {
        let period = MonthPeriod::new(year, month)?;
        let subject_name = self.subject_name(subject)?;

        let loaded = self.db.load_visits_for_period(subject, period)?;
        let names = self.name_lookup()?;
        let totals = VisitTotals::from_records(&loaded.records);
        let visits = loaded
            .records
            .iter()
            .map(|record| names.detail(record))
            .collect();

        tracing::debug!(
            %subject,
            %period,
            total_visits = totals.total_visits,
            issues = loaded.issues.len(),
            "monthly stats computed"
        );

        Ok(MonthlyStats {
            subject,
            subject_name,
            year,
            month,
            totals,
            visits,
            integrity_issues: loaded.issues,
        })
    }

    /// Totals for every patient and hygienist in a month.
    pub fn comparison_report(&self, year: i32, month: u32) -> ReportResult<ComparisonReport> {
        let period = MonthPeriod::new(year, month)?;
        let loaded = self.db.load_all_visits_for_period(period)?;

        let mut by_patient: HashMap<i64, Vec<&VisitRecord>> = HashMap::new();
        let mut by_hygienist: HashMap<i64, Vec<&VisitRecord>> = HashMap::new();
        for record in &loaded.records {
            by_patient.entry(record.patient_id).or_default().push(record);
            by_hygienist.entry(record.hygienist_id).or_default().push(record);
        }

        let mut patients: Vec<EntitySummary> = self
            .db
            .list_patients()?
            .into_iter()
            .map(|p| EntitySummary {
                totals: totals_for(&by_patient, p.id),
                id: p.id,
                code: p.patient_code,
                name: p.name,
            })
            .collect();

        let mut hygienists: Vec<EntitySummary> = self
            .db
            .list_hygienists()?
            .into_iter()
            .map(|h| EntitySummary {
                totals: totals_for(&by_hygienist, h.id),
                id: h.id,
                code: h.staff_code,
                name: h.name,
            })
            .collect();

        rank_by_total_visits(&mut patients);
        rank_by_total_visits(&mut hygienists);

        tracing::debug!(
            %period,
            visits = loaded.records.len(),
            issues = loaded.issues.len(),
            "comparison report computed"
        );

        Ok(ComparisonReport {
            year,
            month,
            patients,
            hygienists,
            integrity_issues: loaded.issues,
        })
    }

    fn subject_name(&self, subject: ReportSubject) -> ReportResult<String> {
        let name = match subject {
            ReportSubject::Patient(id) => self.db.get_patient(id)?.map(|p| p.name),
            ReportSubject::Hygienist(id) => self.db.get_hygienist(id)?.map(|h| h.name),
        };
        name.ok_or(ReportError::UnknownSubject(subject))
    }

    fn name_lookup(&self) -> ReportResult<NameLookup> {
        Ok(NameLookup {
            patients: self
                .db
                .list_patients()?
                .into_iter()
                .map(|p| (p.id, p.name))
                .collect(),
            hygienists: self
                .db
                .list_hygienists()?
                .into_iter()
                .map(|h| (h.id, h.name))
                .collect(),
        })
    }
}

fn totals_for(groups: &HashMap<i64, Vec<&VisitRecord>>, id: i64) -> VisitTotals {
    groups
        .get(&id)
        .map(|records| VisitTotals::from_records(records.iter().copied()))
        .unwrap_or_default()
}

struct NameLookup {
    patients: HashMap<i64, String>,
    hygienists: HashMap<i64, String>,
}

impl NameLookup {
    fn detail(&self, record: &VisitRecord) -> VisitDetail {
        VisitDetail {
            visit_id: record.id,
            visit_date: record.visit_date.to_string(),
            patient_name: self.patients.get(&record.patient_id).cloned().unwrap_or_default(),
            hygienist_name: self
                .hygienists
                .get(&record.hygienist_id)
                .cloned()
                .unwrap_or_default(),
            start_time: record.start_time.clone(),
            end_time: record.end_time.clone(),
            status: record.status,
            duration_minutes: record.duration_minutes(),
            cancellation_reason: record.cancellation_reason.clone(),
            notes: record.notes.clone(),
        }
    }
}
