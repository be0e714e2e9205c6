//! CSV and JSON export of visit reports.

mod table;

pub use table::{escape_csv, Column, Table};

use serde::{Deserialize, Serialize};

use crate::config::ExportConfig;
use crate::report::{ComparisonReport, EntitySummary, MonthlyStats, VisitDetail};
use table::optional;

/// A rendered CSV document with a suggested filename.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CsvExport {
    pub filename: String,
    pub content: String,
}

/// Monthly statistics as CSV, one row per visit.
pub fn monthly_stats_csv(stats: &MonthlyStats) -> CsvExport {
    monthly_stats_csv_with(stats, &ExportConfig::default())
}

pub fn monthly_stats_csv_with(stats: &MonthlyStats, config: &ExportConfig) -> CsvExport {
    let name = format!(
        "visits_{}_{}_{}.csv",
        stats.subject.kind(),
        stats.subject.id(),
        stats.period()
    );

    CsvExport {
        filename: prefixed(config, name),
        content: visit_table().to_csv(&stats.visits, config.include_header),
    }
}

/// Comparison report as CSV, patients first, then hygienists.
pub fn comparison_csv(report: &ComparisonReport) -> CsvExport {
    comparison_csv_with(report, &ExportConfig::default())
}

pub fn comparison_csv_with(report: &ComparisonReport, config: &ExportConfig) -> CsvExport {
    let rows: Vec<ComparisonRow<'_>> = report
        .patients
        .iter()
        .map(|summary| ComparisonRow {
            role: "patient",
            summary,
        })
        .chain(report.hygienists.iter().map(|summary| ComparisonRow {
            role: "hygienist",
            summary,
        }))
        .collect();

    CsvExport {
        filename: prefixed(config, format!("comparison_{}.csv", report.period())),
        content: comparison_table().to_csv(&rows, config.include_header),
    }
}

pub fn monthly_stats_json(stats: &MonthlyStats) -> Result<String, serde_json::Error> {
    stats.to_json()
}

pub fn comparison_json(report: &ComparisonReport) -> Result<String, serde_json::Error> {
    report.to_json()
}

fn prefixed(config: &ExportConfig, name: String) -> String {
    match config.file_prefix.as_deref().map(str::trim) {
        Some(prefix) if !prefix.is_empty() => format!("{}_{}", prefix, name),
        _ => name,
    }
}

fn visit_table() -> Table<VisitDetail> {
    Table::new(vec![
        Column::new("visit_id", |v: &VisitDetail| v.visit_id.to_string()),
        Column::new("visit_date", |v: &VisitDetail| v.visit_date.clone()),
        Column::new("patient", |v: &VisitDetail| v.patient_name.clone()),
        Column::new("hygienist", |v: &VisitDetail| v.hygienist_name.clone()),
        Column::new("start_time", |v: &VisitDetail| optional(&v.start_time)),
        Column::new("end_time", |v: &VisitDetail| optional(&v.end_time)),
        Column::new("status", |v: &VisitDetail| v.status.to_string()),
        Column::new("duration_minutes", |v: &VisitDetail| {
            v.duration_minutes.map(|m| m.to_string()).unwrap_or_default()
        }),
        Column::new("cancellation_reason", |v: &VisitDetail| {
            optional(&v.cancellation_reason)
        }),
        Column::new("notes", |v: &VisitDetail| optional(&v.notes)),
    ])
}

struct ComparisonRow<'a> {
    role: &'static str,
    summary: &'a EntitySummary,
}

fn comparison_table<'a>() -> Table<ComparisonRow<'a>> {
    Table::new(vec![
        Column::new("role", |r: &ComparisonRow<'_>| r.role.to_string()),
        Column::new("id", |r: &ComparisonRow<'_>| r.summary.id.to_string()),
        Column::new("code", |r: &ComparisonRow<'_>| r.summary.code.clone()),
        Column::new("name", |r: &ComparisonRow<'_>| r.summary.name.clone()),
        Column::new("total_visits", |r: &ComparisonRow<'_>| {
            r.summary.totals.total_visits.to_string()
        }),
        Column::new("completed", |r: &ComparisonRow<'_>| {
            r.summary.totals.completed_visits.to_string()
        }),
        Column::new("cancelled", |r: &ComparisonRow<'_>| {
            r.summary.totals.cancelled_visits.to_string()
        }),
        Column::new("scheduled", |r: &ComparisonRow<'_>| {
            r.summary.totals.scheduled_visits.to_string()
        }),
        Column::new("total_hours", |r: &ComparisonRow<'_>| {
            format!("{:.2}", r.summary.totals.total_hours)
        }),
        Column::new("average_minutes", |r: &ComparisonRow<'_>| {
            format!("{:.1}", r.summary.totals.average_visit_duration)
        }),
    ])
}
