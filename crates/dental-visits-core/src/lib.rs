//! Dental Visits Core Library
//!
//! Local record keeping for dental hygienist visits: patient and hygienist
//! master data, visit records with a three-state status lifecycle, form
//! validation, and monthly statistics with CSV export.
//!
//! # Architecture
//!
//! ```text
//!  Host form ──VisitCommand──▶ VisitEntryController ──▶ NotificationSink
//!                                   │      │
//!                          FormState│      │insert / update / status / delete
//!                      (validation) │      ▼
//!                                   │   Database (SQLite)
//!                                   │      │
//!                                   │      ▼ period query
//!                                   │   ReportService ──▶ MonthlyStats / ComparisonReport
//!                                   │                          │
//!                                   │                          ▼
//!                                   │                     CSV / JSON export
//! ```
//!
//! # Core Principle
//!
//! **A cancelled visit always carries a reason.** The store refuses any write
//! that would leave a cancelled record without one.
//!
//! # Modules
//!
//! - [`db`]: SQLite store for patients, hygienists and visit records
//! - [`models`]: Domain types (Patient, Hygienist, VisitRecord, MonthPeriod)
//! - [`validation`]: Declarative field rules and per-form state
//! - [`report`]: Monthly statistics and comparison reports
//! - [`export`]: CSV and JSON export of reports
//! - [`controller`]: Visit entry command handling
//! - [`notify`]: Notification sink boundary
//! - [`config`]: TOML configuration
//! - [`logging`]: `tracing` subscriber setup

pub mod config;
pub mod controller;
pub mod db;
pub mod export;
pub mod logging;
pub mod models;
pub mod notify;
pub mod report;
pub mod validation;

// Re-export commonly used types
pub use config::{CoreConfig, ExportConfig};
pub use controller::{CommandOutcome, VisitCommand, VisitEntryController};
pub use db::Database;
pub use export::CsvExport;
pub use models::{
    Hygienist, HygienistInput, MonthPeriod, Patient, PatientInput, ReportSubject, VisitInput,
    VisitRecord, VisitStatus,
};
pub use notify::{Notification, NotificationQueue, NotificationSink, Severity};
pub use report::{ComparisonReport, MonthlyStats, ReportService, VisitTotals};
pub use validation::{FormState, ValidationRule, ValidationRules};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use models::{HygienistPatch, IntegrityIssue, PatientPatch, VisitPatch};
use report::{EntitySummary, VisitDetail};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum DentalVisitsError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}

impl From<db::DbError> for DentalVisitsError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(_) => DentalVisitsError::NotFound(e.to_string()),
            db::DbError::Constraint(_)
            | db::DbError::InvalidVisit(_)
            | db::DbError::InvalidStatus(_) => DentalVisitsError::InvalidInput(e.to_string()),
            _ => DentalVisitsError::DatabaseError(e.to_string()),
        }
    }
}

impl From<report::ReportError> for DentalVisitsError {
    fn from(e: report::ReportError) -> Self {
        match e {
            report::ReportError::Database(e) => e.into(),
            report::ReportError::InvalidPeriod(_) => DentalVisitsError::InvalidInput(e.to_string()),
            report::ReportError::UnknownSubject(_) => DentalVisitsError::NotFound(e.to_string()),
        }
    }
}

impl From<models::UnknownStatus> for DentalVisitsError {
    fn from(e: models::UnknownStatus) -> Self {
        DentalVisitsError::InvalidInput(e.to_string())
    }
}

impl From<config::ConfigError> for DentalVisitsError {
    fn from(e: config::ConfigError) -> Self {
        match e {
            config::ConfigError::Database(e) => e.into(),
            other => DentalVisitsError::ConfigError(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for DentalVisitsError {
    fn from(e: anyhow::Error) -> Self {
        DentalVisitsError::ConfigError(format!("{:#}", e))
    }
}

impl From<serde_json::Error> for DentalVisitsError {
    fn from(e: serde_json::Error) -> Self {
        DentalVisitsError::SerializationError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for DentalVisitsError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        DentalVisitsError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

/// Run a form's rule map; any violation becomes `InvalidInput` listing each field.
fn check_form(
    rules: &validation::ValidationRules,
    values: &validation::FormValues,
) -> Result<(), DentalVisitsError> {
    let outcome = validation::validate_values(rules, values);
    if outcome.is_valid {
        return Ok(());
    }
    let details: Vec<String> = outcome
        .errors
        .iter()
        .map(|(field, message)| format!("{}: {}", field, message))
        .collect();
    Err(DentalVisitsError::InvalidInput(details.join("; ")))
}

fn parse_date(value: &str) -> Result<NaiveDate, DentalVisitsError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| DentalVisitsError::InvalidInput(format!("Invalid date: {}", value)))
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<DentalVisitsCore>, DentalVisitsError> {
    let db = Database::open(&path)?;
    Ok(DentalVisitsCore::wrap(db, ExportConfig::default()))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<DentalVisitsCore>, DentalVisitsError> {
    let db = Database::open_in_memory()?;
    Ok(DentalVisitsCore::wrap(db, ExportConfig::default()))
}

/// Load a TOML config file, install logging, and open the configured database.
#[uniffi::export]
pub fn open_with_config(config_path: String) -> Result<Arc<DentalVisitsCore>, DentalVisitsError> {
    let config = CoreConfig::load(&config_path)?;
    logging::init_logging(config.log_filter.as_deref());
    let db = config.open_database()?;
    Ok(DentalVisitsCore::wrap(db, config.export))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe database wrapper for FFI.
#[derive(uniffi::Object)]
pub struct DentalVisitsCore {
    db: Arc<Mutex<Database>>,
    export: ExportConfig,
}

impl DentalVisitsCore {
    fn wrap(db: Database, export: ExportConfig) -> Arc<Self> {
        Arc::new(Self {
            db: Arc::new(Mutex::new(db)),
            export,
        })
    }
}

#[uniffi::export]
impl DentalVisitsCore {
    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Validate patient form values without saving anything.
    pub fn validate_patient_form(&self, values: HashMap<String, String>) -> FfiValidationOutcome {
        let values: validation::FormValues = values.into_iter().collect();
        validation::validate_values(&validation::patient_rules(), &values).into()
    }

    pub fn create_patient(&self, input: FfiPatientInput) -> Result<FfiPatient, DentalVisitsError> {
        check_form(&validation::patient_rules(), &input.form_values())?;
        let db = self.db.lock()?;
        Ok(db.insert_patient(&input.into())?.into())
    }

    /// Replace every editable field of a patient.
    pub fn update_patient(
        &self,
        id: i64,
        input: FfiPatientInput,
    ) -> Result<FfiPatient, DentalVisitsError> {
        check_form(&validation::patient_rules(), &input.form_values())?;
        let db = self.db.lock()?;
        let patch = PatientPatch {
            patient_code: Some(input.patient_code),
            name: Some(input.name),
            phone: Some(input.phone),
            email: Some(input.email),
            address: Some(input.address),
        };
        Ok(db.update_patient(id, &patch)?.into())
    }

    pub fn get_patient(&self, id: i64) -> Result<Option<FfiPatient>, DentalVisitsError> {
        let db = self.db.lock()?;
        Ok(db.get_patient(id)?.map(|p| p.into()))
    }

    pub fn list_patients(&self) -> Result<Vec<FfiPatient>, DentalVisitsError> {
        let db = self.db.lock()?;
        Ok(db.list_patients()?.into_iter().map(|p| p.into()).collect())
    }

    /// Search patients by name or code prefix.
    pub fn search_patients(
        &self,
        query: String,
        limit: u32,
    ) -> Result<Vec<FfiPatient>, DentalVisitsError> {
        let db = self.db.lock()?;
        let patients = db.search_patients(&query, limit as usize)?;
        Ok(patients.into_iter().map(|p| p.into()).collect())
    }

    /// Delete a patient with no visit records.
    pub fn delete_patient(&self, id: i64) -> Result<bool, DentalVisitsError> {
        let db = self.db.lock()?;
        Ok(db.delete_patient(id)?)
    }

    // =========================================================================
    // Hygienist Operations
    // =========================================================================

    /// Validate hygienist form values without saving anything.
    pub fn validate_hygienist_form(
        &self,
        values: HashMap<String, String>,
    ) -> FfiValidationOutcome {
        let values: validation::FormValues = values.into_iter().collect();
        validation::validate_values(&validation::hygienist_rules(), &values).into()
    }

    pub fn create_hygienist(
        &self,
        input: FfiHygienistInput,
    ) -> Result<FfiHygienist, DentalVisitsError> {
        check_form(&validation::hygienist_rules(), &input.form_values())?;
        let db = self.db.lock()?;
        Ok(db.insert_hygienist(&input.into())?.into())
    }

    /// Replace every editable field of a hygienist.
    pub fn update_hygienist(
        &self,
        id: i64,
        input: FfiHygienistInput,
    ) -> Result<FfiHygienist, DentalVisitsError> {
        check_form(&validation::hygienist_rules(), &input.form_values())?;
        let db = self.db.lock()?;
        let patch = HygienistPatch {
            staff_code: Some(input.staff_code),
            name: Some(input.name),
            license_number: Some(input.license_number),
            phone: Some(input.phone),
            email: Some(input.email),
        };
        Ok(db.update_hygienist(id, &patch)?.into())
    }

    pub fn get_hygienist(&self, id: i64) -> Result<Option<FfiHygienist>, DentalVisitsError> {
        let db = self.db.lock()?;
        Ok(db.get_hygienist(id)?.map(|h| h.into()))
    }

    pub fn list_hygienists(&self) -> Result<Vec<FfiHygienist>, DentalVisitsError> {
        let db = self.db.lock()?;
        Ok(db.list_hygienists()?.into_iter().map(|h| h.into()).collect())
    }

    pub fn search_hygienists(
        &self,
        query: String,
        limit: u32,
    ) -> Result<Vec<FfiHygienist>, DentalVisitsError> {
        let db = self.db.lock()?;
        let hygienists = db.search_hygienists(&query, limit as usize)?;
        Ok(hygienists.into_iter().map(|h| h.into()).collect())
    }

    pub fn delete_hygienist(&self, id: i64) -> Result<bool, DentalVisitsError> {
        let db = self.db.lock()?;
        Ok(db.delete_hygienist(id)?)
    }

    // =========================================================================
    // Visit Record Operations
    // =========================================================================

    /// Validate visit form values without saving anything.
    pub fn validate_visit_form(&self, values: HashMap<String, String>) -> FfiValidationOutcome {
        let values: validation::FormValues = values.into_iter().collect();
        validation::validate_values(&validation::visit_record_rules(), &values).into()
    }

    pub fn create_visit(&self, input: FfiVisitInput) -> Result<FfiVisitRecord, DentalVisitsError> {
        let input = VisitInput::try_from(input)?;
        let db = self.db.lock()?;
        Ok(db.insert_visit(&input)?.into())
    }

    /// Replace every editable field of a visit record.
    pub fn update_visit(
        &self,
        id: i64,
        input: FfiVisitInput,
    ) -> Result<FfiVisitRecord, DentalVisitsError> {
        let input = VisitInput::try_from(input)?;
        let patch = VisitPatch {
            patient_id: Some(input.patient_id),
            hygienist_id: Some(input.hygienist_id),
            visit_date: Some(input.visit_date),
            start_time: Some(input.start_time),
            end_time: Some(input.end_time),
            status: Some(input.status),
            cancellation_reason: Some(input.cancellation_reason),
            notes: Some(input.notes),
        };
        let db = self.db.lock()?;
        Ok(db.update_visit(id, &patch)?.into())
    }

    /// Move a visit to a new status. Cancelling requires a reason.
    pub fn change_visit_status(
        &self,
        id: i64,
        status: String,
        reason: Option<String>,
    ) -> Result<FfiVisitRecord, DentalVisitsError> {
        let status: VisitStatus = status.parse()?;
        let db = self.db.lock()?;
        Ok(db.change_visit_status(id, status, reason.as_deref())?.into())
    }

    pub fn get_visit(&self, id: i64) -> Result<Option<FfiVisitRecord>, DentalVisitsError> {
        let db = self.db.lock()?;
        Ok(db.get_visit(id)?.map(|v| v.into()))
    }

    pub fn list_visits(&self) -> Result<Vec<FfiVisitRecord>, DentalVisitsError> {
        let db = self.db.lock()?;
        Ok(db.list_visits()?.into_iter().map(|v| v.into()).collect())
    }

    /// Visits on one calendar day (`YYYY-MM-DD`).
    pub fn list_visits_for_date(&self, date: String) -> Result<Vec<FfiVisitRecord>, DentalVisitsError> {
        let date = parse_date(&date)?;
        let db = self.db.lock()?;
        Ok(db.list_visits_for_date(date)?.into_iter().map(|v| v.into()).collect())
    }

    /// Visits between two days, inclusive.
    pub fn list_visits_in_range(
        &self,
        from: String,
        to: String,
    ) -> Result<Vec<FfiVisitRecord>, DentalVisitsError> {
        let (from, to) = (parse_date(&from)?, parse_date(&to)?);
        let db = self.db.lock()?;
        Ok(db
            .list_visits_in_range(from, to)?
            .into_iter()
            .map(|v| v.into())
            .collect())
    }

    pub fn delete_visit(&self, id: i64) -> Result<bool, DentalVisitsError> {
        let db = self.db.lock()?;
        Ok(db.delete_visit(id)?)
    }

    // =========================================================================
    // Report Operations
    // =========================================================================

    pub fn get_monthly_stats(
        &self,
        kind: FfiSubjectKind,
        id: i64,
        year: i32,
        month: u32,
    ) -> Result<FfiMonthlyStats, DentalVisitsError> {
        let db = self.db.lock()?;
        let stats = ReportService::new(&db).monthly_stats(kind.subject(id), year, month)?;
        Ok(stats.into())
    }

    pub fn get_comparison_report(
        &self,
        year: i32,
        month: u32,
    ) -> Result<FfiComparisonReport, DentalVisitsError> {
        let db = self.db.lock()?;
        let report = ReportService::new(&db).comparison_report(year, month)?;
        Ok(report.into())
    }

    // =========================================================================
    // Export Operations
    // =========================================================================

    /// Export monthly statistics as CSV.
    pub fn export_monthly_stats_csv(
        &self,
        kind: FfiSubjectKind,
        id: i64,
        year: i32,
        month: u32,
    ) -> Result<FfiCsvExport, DentalVisitsError> {
        let db = self.db.lock()?;
        let stats = ReportService::new(&db).monthly_stats(kind.subject(id), year, month)?;
        Ok(export::monthly_stats_csv_with(&stats, &self.export).into())
    }

    /// Export a comparison report as CSV.
    pub fn export_comparison_csv(
        &self,
        year: i32,
        month: u32,
    ) -> Result<FfiCsvExport, DentalVisitsError> {
        let db = self.db.lock()?;
        let report = ReportService::new(&db).comparison_report(year, month)?;
        Ok(export::comparison_csv_with(&report, &self.export).into())
    }

    /// Export monthly statistics as JSON.
    pub fn export_monthly_stats_json(
        &self,
        kind: FfiSubjectKind,
        id: i64,
        year: i32,
        month: u32,
    ) -> Result<String, DentalVisitsError> {
        let db = self.db.lock()?;
        let stats = ReportService::new(&db).monthly_stats(kind.subject(id), year, month)?;
        Ok(export::monthly_stats_json(&stats)?)
    }

    /// Export a comparison report as JSON.
    pub fn export_comparison_json(&self, year: i32, month: u32) -> Result<String, DentalVisitsError> {
        let db = self.db.lock()?;
        let report = ReportService::new(&db).comparison_report(year, month)?;
        Ok(export::comparison_json(&report)?)
    }
}

// =========================================================================
// FFI Types
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiSubjectKind {
    Patient,
    Hygienist,
}

impl FfiSubjectKind {
    fn subject(self, id: i64) -> ReportSubject {
        match self {
            FfiSubjectKind::Patient => ReportSubject::Patient(id),
            FfiSubjectKind::Hygienist => ReportSubject::Hygienist(id),
        }
    }
}

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub id: i64,
    pub patient_code: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Patient> for FfiPatient {
    fn from(p: Patient) -> Self {
        Self {
            id: p.id,
            patient_code: p.patient_code,
            name: p.name,
            phone: p.phone,
            email: p.email,
            address: p.address,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientInput {
    pub patient_code: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl From<FfiPatientInput> for PatientInput {
    fn from(input: FfiPatientInput) -> Self {
        PatientInput {
            patient_code: input.patient_code,
            name: input.name,
            phone: input.phone,
            email: input.email,
            address: input.address,
        }
    }
}

impl FfiPatientInput {
    fn form_values(&self) -> validation::FormValues {
        let optional = |value: &Option<String>| value.clone().unwrap_or_default();
        let mut values = validation::FormValues::new();
        values.insert("patient_code".into(), self.patient_code.clone());
        values.insert("name".into(), self.name.clone());
        values.insert("phone".into(), optional(&self.phone));
        values.insert("email".into(), optional(&self.email));
        values.insert("address".into(), optional(&self.address));
        values
    }
}

/// FFI-safe hygienist.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiHygienist {
    pub id: i64,
    pub staff_code: String,
    pub name: String,
    pub license_number: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Hygienist> for FfiHygienist {
    fn from(h: Hygienist) -> Self {
        Self {
            id: h.id,
            staff_code: h.staff_code,
            name: h.name,
            license_number: h.license_number,
            phone: h.phone,
            email: h.email,
            created_at: h.created_at,
            updated_at: h.updated_at,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiHygienistInput {
    pub staff_code: String,
    pub name: String,
    pub license_number: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl From<FfiHygienistInput> for HygienistInput {
    fn from(input: FfiHygienistInput) -> Self {
        HygienistInput {
            staff_code: input.staff_code,
            name: input.name,
            license_number: input.license_number,
            phone: input.phone,
            email: input.email,
        }
    }
}

impl FfiHygienistInput {
    fn form_values(&self) -> validation::FormValues {
        let optional = |value: &Option<String>| value.clone().unwrap_or_default();
        let mut values = validation::FormValues::new();
        values.insert("staff_code".into(), self.staff_code.clone());
        values.insert("name".into(), self.name.clone());
        values.insert("license_number".into(), optional(&self.license_number));
        values.insert("phone".into(), optional(&self.phone));
        values.insert("email".into(), optional(&self.email));
        values
    }
}

/// FFI-safe visit record. Dates are `YYYY-MM-DD`, times `HH:MM`.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiVisitRecord {
    pub id: i64,
    pub patient_id: i64,
    pub hygienist_id: i64,
    pub visit_date: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub status: String,
    pub cancellation_reason: Option<String>,
    pub notes: Option<String>,
    pub duration_minutes: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<VisitRecord> for FfiVisitRecord {
    fn from(v: VisitRecord) -> Self {
        Self {
            duration_minutes: v.duration_minutes(),
            id: v.id,
            patient_id: v.patient_id,
            hygienist_id: v.hygienist_id,
            visit_date: v.visit_date.to_string(),
            start_time: v.start_time,
            end_time: v.end_time,
            status: v.status.to_string(),
            cancellation_reason: v.cancellation_reason,
            notes: v.notes,
            created_at: v.created_at,
            updated_at: v.updated_at,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiVisitInput {
    pub patient_id: i64,
    pub hygienist_id: i64,
    pub visit_date: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub status: String,
    pub cancellation_reason: Option<String>,
    pub notes: Option<String>,
}

impl TryFrom<FfiVisitInput> for VisitInput {
    type Error = DentalVisitsError;

    fn try_from(input: FfiVisitInput) -> Result<Self, Self::Error> {
        Ok(VisitInput {
            patient_id: input.patient_id,
            hygienist_id: input.hygienist_id,
            visit_date: parse_date(&input.visit_date)?,
            start_time: input.start_time,
            end_time: input.end_time,
            status: input.status.parse()?,
            cancellation_reason: input.cancellation_reason,
            notes: input.notes,
        })
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiValidationOutcome {
    pub is_valid: bool,
    pub errors: HashMap<String, String>,
}

impl From<validation::ValidationOutcome> for FfiValidationOutcome {
    fn from(outcome: validation::ValidationOutcome) -> Self {
        Self {
            is_valid: outcome.is_valid,
            errors: outcome.errors.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiIntegrityIssue {
    pub visit_id: i64,
    pub problem: String,
}

impl From<IntegrityIssue> for FfiIntegrityIssue {
    fn from(issue: IntegrityIssue) -> Self {
        Self {
            visit_id: issue.visit_id,
            problem: issue.problem,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiVisitTotals {
    pub total_visits: u32,
    pub completed_visits: u32,
    pub cancelled_visits: u32,
    pub scheduled_visits: u32,
    pub total_hours: f64,
    pub average_visit_duration: f64,
}

impl From<VisitTotals> for FfiVisitTotals {
    fn from(t: VisitTotals) -> Self {
        Self {
            total_visits: t.total_visits,
            completed_visits: t.completed_visits,
            cancelled_visits: t.cancelled_visits,
            scheduled_visits: t.scheduled_visits,
            total_hours: t.total_hours,
            average_visit_duration: t.average_visit_duration,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiVisitDetail {
    pub visit_id: i64,
    pub visit_date: String,
    pub patient_name: String,
    pub hygienist_name: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub status: String,
    pub duration_minutes: Option<i64>,
    pub cancellation_reason: Option<String>,
    pub notes: Option<String>,
}

impl From<VisitDetail> for FfiVisitDetail {
    fn from(d: VisitDetail) -> Self {
        Self {
            visit_id: d.visit_id,
            visit_date: d.visit_date,
            patient_name: d.patient_name,
            hygienist_name: d.hygienist_name,
            start_time: d.start_time,
            end_time: d.end_time,
            status: d.status.to_string(),
            duration_minutes: d.duration_minutes,
            cancellation_reason: d.cancellation_reason,
            notes: d.notes,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMonthlyStats {
    pub subject_kind: FfiSubjectKind,
    pub subject_id: i64,
    pub subject_name: String,
    pub year: i32,
    pub month: u32,
    pub totals: FfiVisitTotals,
    pub visits: Vec<FfiVisitDetail>,
    pub integrity_issues: Vec<FfiIntegrityIssue>,
}

impl From<MonthlyStats> for FfiMonthlyStats {
    fn from(s: MonthlyStats) -> Self {
        let subject_kind = match s.subject {
            ReportSubject::Patient(_) => FfiSubjectKind::Patient,
            ReportSubject::Hygienist(_) => FfiSubjectKind::Hygienist,
        };
        Self {
            subject_kind,
            subject_id: s.subject.id(),
            subject_name: s.subject_name,
            year: s.year,
            month: s.month,
            totals: s.totals.into(),
            visits: s.visits.into_iter().map(|v| v.into()).collect(),
            integrity_issues: s.integrity_issues.into_iter().map(|i| i.into()).collect(),
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiEntitySummary {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub totals: FfiVisitTotals,
}

impl From<EntitySummary> for FfiEntitySummary {
    fn from(s: EntitySummary) -> Self {
        Self {
            id: s.id,
            code: s.code,
            name: s.name,
            totals: s.totals.into(),
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiComparisonReport {
    pub year: i32,
    pub month: u32,
    pub patients: Vec<FfiEntitySummary>,
    pub hygienists: Vec<FfiEntitySummary>,
    pub integrity_issues: Vec<FfiIntegrityIssue>,
}

impl From<ComparisonReport> for FfiComparisonReport {
    fn from(r: ComparisonReport) -> Self {
        Self {
            year: r.year,
            month: r.month,
            patients: r.patients.into_iter().map(|s| s.into()).collect(),
            hygienists: r.hygienists.into_iter().map(|s| s.into()).collect(),
            integrity_issues: r.integrity_issues.into_iter().map(|i| i.into()).collect(),
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCsvExport {
    pub filename: String,
    pub content: String,
}

impl From<CsvExport> for FfiCsvExport {
    fn from(e: CsvExport) -> Self {
        Self {
            filename: e.filename,
            content: e.content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core_with_visit() -> (Arc<DentalVisitsCore>, FfiVisitRecord) {
        let core = open_database_in_memory().unwrap();
        let patient = core
            .create_patient(FfiPatientInput {
                patient_code: "P-1".into(),
                name: "Hanako".into(),
                phone: None,
                email: None,
                address: None,
            })
            .unwrap();
        let hygienist = core
            .create_hygienist(FfiHygienistInput {
                staff_code: "H-1".into(),
                name: "Keiko".into(),
                license_number: None,
                phone: None,
                email: None,
            })
            .unwrap();
        let visit = core
            .create_visit(FfiVisitInput {
                patient_id: patient.id,
                hygienist_id: hygienist.id,
                visit_date: "2024-09-10".into(),
                start_time: Some("10:00".into()),
                end_time: Some("10:40".into()),
                status: "completed".into(),
                cancellation_reason: None,
                notes: None,
            })
            .unwrap();
        (core, visit)
    }

    #[test]
    fn test_facade_round_trip() {
        let (core, visit) = core_with_visit();
        assert_eq!(visit.duration_minutes, Some(40));

        let listed = core.list_visits_for_date("2024-09-10".into()).unwrap();
        assert_eq!(listed.len(), 1);

        let stats = core
            .get_monthly_stats(FfiSubjectKind::Patient, visit.patient_id, 2024, 9)
            .unwrap();
        assert_eq!(stats.totals.total_visits, 1);
        assert_eq!(stats.visits[0].hygienist_name, "Keiko");
    }

    #[test]
    fn test_facade_errors() {
        let (core, visit) = core_with_visit();

        let err = core
            .change_visit_status(visit.id, "cancelled".into(), None)
            .unwrap_err();
        assert!(matches!(err, DentalVisitsError::InvalidInput(_)));

        let err = core
            .change_visit_status(visit.id, "no_show".into(), None)
            .unwrap_err();
        assert!(matches!(err, DentalVisitsError::InvalidInput(_)));

        let err = core.get_comparison_report(2024, 0).unwrap_err();
        assert!(matches!(err, DentalVisitsError::InvalidInput(_)));

        let err = core
            .get_monthly_stats(FfiSubjectKind::Hygienist, 77, 2024, 9)
            .unwrap_err();
        assert!(matches!(err, DentalVisitsError::NotFound(_)));
    }

    #[test]
    fn test_facade_csv_export() {
        let (core, visit) = core_with_visit();
        let export = core
            .export_monthly_stats_csv(FfiSubjectKind::Hygienist, visit.hygienist_id, 2024, 9)
            .unwrap();
        assert_eq!(
            export.filename,
            format!("visits_hygienist_{}_2024-09.csv", visit.hygienist_id)
        );
        assert_eq!(export.content.lines().count(), 2);

        let comparison = core.export_comparison_csv(2024, 9).unwrap();
        assert_eq!(comparison.filename, "comparison_2024-09.csv");
    }

    #[test]
    fn test_validate_visit_form() {
        let (core, _) = core_with_visit();
        let values = HashMap::from([
            ("status".to_string(), "cancelled".to_string()),
            ("visit_date".to_string(), "2024-02-30".to_string()),
        ]);
        let outcome = core.validate_visit_form(values);
        assert!(!outcome.is_valid);
        assert!(outcome.errors.contains_key("cancellation_reason"));
        assert!(outcome.errors.contains_key("visit_date"));
        assert!(outcome.errors.contains_key("patient_id"));
    }

    #[test]
    fn test_create_patient_rejects_invalid_fields() {
        let core = open_database_in_memory().unwrap();
        let err = core
            .create_patient(FfiPatientInput {
                patient_code: "".into(),
                name: "   ".into(),
                phone: Some("call me".into()),
                email: Some("not-an-email".into()),
                address: None,
            })
            .unwrap_err();

        let message = match err {
            DentalVisitsError::InvalidInput(message) => message,
            other => panic!("expected InvalidInput, got {:?}", other),
        };
        for field in ["patient_code", "name", "phone", "email"] {
            assert!(message.contains(field), "{} missing from {}", field, message);
        }
        assert!(core.list_patients().unwrap().is_empty());
    }

    #[test]
    fn test_update_entities_rejects_invalid_fields() {
        let (core, visit) = core_with_visit();

        let err = core
            .update_patient(
                visit.patient_id,
                FfiPatientInput {
                    patient_code: "P 1".into(),
                    name: "Hanako".into(),
                    phone: None,
                    email: None,
                    address: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, DentalVisitsError::InvalidInput(_)));
        let patient = core.get_patient(visit.patient_id).unwrap().unwrap();
        assert_eq!(patient.patient_code, "P-1");

        let err = core
            .update_hygienist(
                visit.hygienist_id,
                FfiHygienistInput {
                    staff_code: "H-1".into(),
                    name: "K".into(),
                    license_number: None,
                    phone: None,
                    email: Some("keiko@".into()),
                },
            )
            .unwrap_err();
        assert!(matches!(err, DentalVisitsError::InvalidInput(_)));
        let hygienist = core.get_hygienist(visit.hygienist_id).unwrap().unwrap();
        assert_eq!(hygienist.name, "Keiko");
    }

    #[test]
    fn test_create_hygienist_rejects_blank_code() {
        let core = open_database_in_memory().unwrap();
        let err = core
            .create_hygienist(FfiHygienistInput {
                staff_code: " ".into(),
                name: "Keiko".into(),
                license_number: Some("L".repeat(31)),
                phone: None,
                email: None,
            })
            .unwrap_err();
        assert!(matches!(err, DentalVisitsError::InvalidInput(_)));
        assert!(core.list_hygienists().unwrap().is_empty());
    }

    #[test]
    fn test_validate_entity_forms() {
        let core = open_database_in_memory().unwrap();

        let outcome = core.validate_patient_form(HashMap::from([
            ("patient_code".to_string(), "P-0001".to_string()),
            ("name".to_string(), "Hanako Yamada".to_string()),
        ]));
        assert!(outcome.is_valid);
        assert!(outcome.errors.is_empty());

        let outcome = core.validate_patient_form(HashMap::from([(
            "email".to_string(),
            "hanako@".to_string(),
        )]));
        assert!(!outcome.is_valid);
        assert_eq!(outcome.errors["email"], "Invalid email address");
        assert!(outcome.errors.contains_key("patient_code"));

        let outcome = core.validate_hygienist_form(HashMap::new());
        assert!(!outcome.is_valid);
        assert!(outcome.errors.contains_key("staff_code"));
        assert!(outcome.errors.contains_key("name"));
    }
}
