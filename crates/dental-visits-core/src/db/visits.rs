//! Visit record database operations.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{
    IntegrityIssue, MonthPeriod, ReportSubject, VisitInput, VisitPatch, VisitRecord, VisitStatus,
};

const VISIT_COLUMNS: &str = "id, patient_id, hygienist_id, visit_date, start_time, end_time, \
     status, cancellation_reason, notes, created_at, updated_at";

const VISIT_ORDER: &str = "ORDER BY visit_date, start_time IS NULL, start_time, id";

/// Visits loaded for a reporting period. Rows that could not be interpreted
/// are reported in `issues` instead of failing the whole load.
#[derive(Debug, Clone, Default)]
pub struct PeriodVisits {
    pub records: Vec<VisitRecord>,
    pub issues: Vec<IntegrityIssue>,
}

/// Intermediate row struct for database mapping.
struct VisitRow {
    id: i64,
    patient_id: i64,
    hygienist_id: i64,
    visit_date: String,
    start_time: Option<String>,
    end_time: Option<String>,
    status: String,
    cancellation_reason: Option<String>,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

fn visit_row(row: &Row<'_>) -> rusqlite::Result<VisitRow> {
    Ok(VisitRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        hygienist_id: row.get(2)?,
        visit_date: row.get(3)?,
        start_time: row.get(4)?,
        end_time: row.get(5)?,
        status: row.get(6)?,
        cancellation_reason: row.get(7)?,
        notes: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

impl TryFrom<VisitRow> for VisitRecord {
    type Error = DbError;

    fn try_from(row: VisitRow) -> Result<Self, Self::Error> {
        let status: VisitStatus = row.status.parse()?;
        let visit_date = NaiveDate::parse_from_str(&row.visit_date, "%Y-%m-%d").map_err(|_| {
            DbError::InvalidData(format!("visit {} has date {:?}", row.id, row.visit_date))
        })?;

        // A reason stored against a non-cancelled visit is ignored.
        let cancellation_reason = match status {
            VisitStatus::Cancelled => row.cancellation_reason,
            VisitStatus::Scheduled | VisitStatus::Completed => None,
        };

        Ok(VisitRecord {
            id: row.id,
            patient_id: row.patient_id,
            hygienist_id: row.hygienist_id,
            visit_date,
            start_time: row.start_time,
            end_time: row.end_time,
            status,
            cancellation_reason,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl Database {
    /// Create a visit record after checking its invariants and references.
    pub fn insert_visit(&self, input: &VisitInput) -> DbResult<VisitRecord> {
        let mut record = VisitRecord::from_input(input);
        record.check_invariants()?;
        self.check_visit_references(&record)?;

        self.conn.execute(
            r#"
            INSERT INTO visit_records (
                patient_id, hygienist_id, visit_date, start_time, end_time,
                status, cancellation_reason, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                record.patient_id,
                record.hygienist_id,
                record.visit_date.to_string(),
                record.start_time,
                record.end_time,
                record.status.as_str(),
                record.cancellation_reason,
                record.notes,
                record.created_at,
                record.updated_at,
            ],
        )?;
        record.id = self.conn.last_insert_rowid();

        tracing::info!(
            visit_id = record.id,
            patient_id = record.patient_id,
            hygienist_id = record.hygienist_id,
            date = %record.visit_date,
            status = %record.status,
            "visit recorded"
        );
        Ok(record)
    }

    /// Apply a partial update to a visit record.
    pub fn update_visit(&self, id: i64, patch: &VisitPatch) -> DbResult<VisitRecord> {
        let mut record = self.require_visit(id)?;
        let previous_status = record.status;

        record.apply(patch);
        record.check_invariants()?;
        self.check_visit_references(&record)?;
        record.touch();
        self.write_visit(&record)?;

        if previous_status != record.status {
            tracing::info!(
                visit_id = id,
                from = %previous_status,
                to = %record.status,
                "visit status changed"
            );
        } else {
            tracing::debug!(visit_id = id, "visit updated");
        }
        Ok(record)
    }

    /// Move a visit to `status`. Cancelling requires a non-empty reason.
    pub fn change_visit_status(
        &self,
        id: i64,
        status: VisitStatus,
        reason: Option<&str>,
    ) -> DbResult<VisitRecord> {
        let mut record = self.require_visit(id)?;
        let previous_status = record.status;

        record.transition_to(status, reason)?;
        record.touch();
        self.write_visit(&record)?;

        tracing::info!(
            visit_id = id,
            from = %previous_status,
            to = %status,
            "visit status changed"
        );
        Ok(record)
    }

    /// Get a visit record by ID.
    pub fn get_visit(&self, id: i64) -> DbResult<Option<VisitRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM visit_records WHERE id = ?", VISIT_COLUMNS),
                [id],
                visit_row,
            )
            .optional()?
            .map(VisitRecord::try_from)
            .transpose()
    }

    /// List every visit record, ordered by date and start time.
    pub fn list_visits(&self) -> DbResult<Vec<VisitRecord>> {
        self.query_visits(&format!(
            "SELECT {} FROM visit_records {}",
            VISIT_COLUMNS, VISIT_ORDER
        ), [])
    }

    /// List visits on one calendar day.
    pub fn list_visits_for_date(&self, date: NaiveDate) -> DbResult<Vec<VisitRecord>> {
        self.query_visits(
            &format!(
                "SELECT {} FROM visit_records WHERE visit_date = ?1 {}",
                VISIT_COLUMNS, VISIT_ORDER
            ),
            [date.to_string()],
        )
    }

    /// List visits between two days, inclusive (calendar view).
    pub fn list_visits_in_range(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<VisitRecord>> {
        self.query_visits(
            &format!(
                "SELECT {} FROM visit_records WHERE visit_date >= ?1 AND visit_date <= ?2 {}",
                VISIT_COLUMNS, VISIT_ORDER
            ),
            [from.to_string(), to.to_string()],
        )
    }

    /// Load one subject's visits for a month, collecting unreadable rows as
    /// integrity issues.
    pub fn load_visits_for_period(
        &self,
        subject: ReportSubject,
        period: MonthPeriod,
    ) -> DbResult<PeriodVisits> {
        let column = match subject {
            ReportSubject::Patient(_) => "patient_id",
            ReportSubject::Hygienist(_) => "hygienist_id",
        };
        let sql = format!(
            "SELECT {} FROM visit_records WHERE {} = ?1 AND visit_date >= ?2 AND visit_date < ?3 {}",
            VISIT_COLUMNS, column, VISIT_ORDER
        );
        self.load_period(
            &sql,
            params![
                subject.id(),
                period.first_day().to_string(),
                period.next_first_day().to_string()
            ],
        )
    }

    /// Load every visit in a month.
    pub fn load_all_visits_for_period(&self, period: MonthPeriod) -> DbResult<PeriodVisits> {
        let sql = format!(
            "SELECT {} FROM visit_records WHERE visit_date >= ?1 AND visit_date < ?2 {}",
            VISIT_COLUMNS, VISIT_ORDER
        );
        self.load_period(
            &sql,
            params![
                period.first_day().to_string(),
                period.next_first_day().to_string()
            ],
        )
    }

    /// Delete a visit record.
    pub fn delete_visit(&self, id: i64) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM visit_records WHERE id = ?", [id])?;
        if rows_affected > 0 {
            tracing::info!(visit_id = id, "visit deleted");
        }
        Ok(rows_affected > 0)
    }

    fn require_visit(&self, id: i64) -> DbResult<VisitRecord> {
        self.get_visit(id)?
            .ok_or_else(|| DbError::NotFound(format!("visit {}", id)))
    }

    fn check_visit_references(&self, record: &VisitRecord) -> DbResult<()> {
        if self.get_patient(record.patient_id)?.is_none() {
            return Err(DbError::Constraint(format!(
                "patient {} does not exist",
                record.patient_id
            )));
        }
        if self.get_hygienist(record.hygienist_id)?.is_none() {
            return Err(DbError::Constraint(format!(
                "hygienist {} does not exist",
                record.hygienist_id
            )));
        }
        Ok(())
    }

    fn write_visit(&self, record: &VisitRecord) -> DbResult<()> {
        self.conn.execute(
            r#"
            UPDATE visit_records SET
                patient_id = ?2,
                hygienist_id = ?3,
                visit_date = ?4,
                start_time = ?5,
                end_time = ?6,
                status = ?7,
                cancellation_reason = ?8,
                notes = ?9,
                updated_at = ?10
            WHERE id = ?1
            "#,
            params![
                record.id,
                record.patient_id,
                record.hygienist_id,
                record.visit_date.to_string(),
                record.start_time,
                record.end_time,
                record.status.as_str(),
                record.cancellation_reason,
                record.notes,
                record.updated_at,
            ],
        )?;
        Ok(())
    }

    fn query_visits<P: rusqlite::Params>(&self, sql: &str, params: P) -> DbResult<Vec<VisitRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, visit_row)?;

        let mut visits = Vec::new();
        for row in rows {
            visits.push(row?.try_into()?);
        }
        Ok(visits)
    }

    fn load_period<P: rusqlite::Params>(&self, sql: &str, params: P) -> DbResult<PeriodVisits> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, visit_row)?;

        let mut loaded = PeriodVisits::default();
        for row in rows {
            let row = row?;
            let visit_id = row.id;
            match VisitRecord::try_from(row) {
                Ok(record) => loaded.records.push(record),
                Err(e) => {
                    tracing::warn!(visit_id, error = %e, "skipping unreadable visit row");
                    loaded.issues.push(IntegrityIssue {
                        visit_id,
                        problem: e.to_string(),
                    });
                }
            }
        }
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HygienistInput, PatientInput, VisitError};

    struct Fixture {
        db: Database,
        patient_id: i64,
        hygienist_id: i64,
    }

    fn setup() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let patient = db.insert_patient(&PatientInput::new("P-0001", "Hanako")).unwrap();
        let hygienist = db.insert_hygienist(&HygienistInput::new("H-01", "Keiko")).unwrap();
        Fixture {
            db,
            patient_id: patient.id,
            hygienist_id: hygienist.id,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn test_insert_and_get_visit() {
        let f = setup();
        let input = VisitInput::scheduled(f.patient_id, f.hygienist_id, day(10))
            .with_times("09:00", "09:45");

        let visit = f.db.insert_visit(&input).unwrap();
        let retrieved = f.db.get_visit(visit.id).unwrap().unwrap();

        assert_eq!(retrieved, visit);
        assert_eq!(retrieved.status, VisitStatus::Scheduled);
        assert_eq!(retrieved.duration_minutes(), Some(45));
    }

    #[test]
    fn test_insert_cancelled_without_reason_rejected() {
        let f = setup();
        let input = VisitInput::scheduled(f.patient_id, f.hygienist_id, day(10))
            .with_status(VisitStatus::Cancelled, None);

        let result = f.db.insert_visit(&input);
        assert!(matches!(
            result,
            Err(DbError::InvalidVisit(VisitError::MissingCancellationReason))
        ));
        assert!(f.db.list_visits().unwrap().is_empty());
    }

    #[test]
    fn test_insert_inverted_times_rejected() {
        let f = setup();
        let input = VisitInput::scheduled(f.patient_id, f.hygienist_id, day(10))
            .with_times("10:00", "09:00");
        assert!(matches!(
            f.db.insert_visit(&input),
            Err(DbError::InvalidVisit(VisitError::EndNotAfterStart { .. }))
        ));
    }

    #[test]
    fn test_insert_unknown_patient_rejected() {
        let f = setup();
        let input = VisitInput::scheduled(999, f.hygienist_id, day(10));
        assert!(matches!(f.db.insert_visit(&input), Err(DbError::Constraint(_))));
    }

    #[test]
    fn test_change_status_lifecycle() {
        let f = setup();
        let visit = f
            .db
            .insert_visit(&VisitInput::scheduled(f.patient_id, f.hygienist_id, day(10)))
            .unwrap();

        let err = f
            .db
            .change_visit_status(visit.id, VisitStatus::Cancelled, Some(""))
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidVisit(_)));
        let unchanged = f.db.get_visit(visit.id).unwrap().unwrap();
        assert_eq!(unchanged.status, VisitStatus::Scheduled);

        let cancelled = f
            .db
            .change_visit_status(visit.id, VisitStatus::Cancelled, Some("Caught a cold"))
            .unwrap();
        assert_eq!(cancelled.cancellation_reason.as_deref(), Some("Caught a cold"));

        let completed = f
            .db
            .change_visit_status(visit.id, VisitStatus::Completed, None)
            .unwrap();
        assert_eq!(completed.cancellation_reason, None);

        let stored = f.db.get_visit(visit.id).unwrap().unwrap();
        assert_eq!(stored.status, VisitStatus::Completed);
        assert_eq!(stored.cancellation_reason, None);
    }

    #[test]
    fn test_change_status_missing_visit() {
        let f = setup();
        let result = f.db.change_visit_status(7, VisitStatus::Completed, None);
        assert!(matches!(result, Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_update_visit_patch() {
        let f = setup();
        let visit = f
            .db
            .insert_visit(&VisitInput::scheduled(f.patient_id, f.hygienist_id, day(10)))
            .unwrap();

        let updated = f
            .db
            .update_visit(
                visit.id,
                &VisitPatch {
                    start_time: Some(Some("13:00".into())),
                    end_time: Some(Some("14:00".into())),
                    status: Some(VisitStatus::Completed),
                    notes: Some(Some("Scaling".into())),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.status, VisitStatus::Completed);
        assert_eq!(updated.duration_minutes(), Some(60));
        assert_eq!(f.db.get_visit(visit.id).unwrap().unwrap().notes.as_deref(), Some("Scaling"));
    }

    #[test]
    fn test_update_visit_invalid_patch_leaves_row() {
        let f = setup();
        let visit = f
            .db
            .insert_visit(&VisitInput::scheduled(f.patient_id, f.hygienist_id, day(10)))
            .unwrap();

        let result = f.db.update_visit(
            visit.id,
            &VisitPatch {
                status: Some(VisitStatus::Cancelled),
                ..Default::default()
            },
        );
        assert!(result.is_err());
        assert_eq!(
            f.db.get_visit(visit.id).unwrap().unwrap().status,
            VisitStatus::Scheduled
        );
    }

    #[test]
    fn test_list_by_date_and_range() {
        let f = setup();
        for (d, start) in [(3, "14:00"), (3, "09:00"), (10, "10:00"), (31, "11:00")] {
            let input = VisitInput::scheduled(f.patient_id, f.hygienist_id, day(d))
                .with_times(start, "15:00");
            f.db.insert_visit(&input).unwrap();
        }

        let on_third = f.db.list_visits_for_date(day(3)).unwrap();
        assert_eq!(on_third.len(), 2);
        assert_eq!(on_third[0].start_time.as_deref(), Some("09:00"));

        let range = f.db.list_visits_in_range(day(3), day(10)).unwrap();
        assert_eq!(range.len(), 3);
    }

    #[test]
    fn test_load_period_filters_subject_and_month() {
        let f = setup();
        let other = f
            .db
            .insert_patient(&PatientInput::new("P-0002", "Taro"))
            .unwrap();

        f.db.insert_visit(&VisitInput::scheduled(f.patient_id, f.hygienist_id, day(1)))
            .unwrap();
        f.db.insert_visit(&VisitInput::scheduled(f.patient_id, f.hygienist_id, day(31)))
            .unwrap();
        f.db.insert_visit(&VisitInput::scheduled(
            f.patient_id,
            f.hygienist_id,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        ))
        .unwrap();
        f.db.insert_visit(&VisitInput::scheduled(other.id, f.hygienist_id, day(15)))
            .unwrap();

        let period = MonthPeriod::new(2024, 5).unwrap();
        let patient_visits = f
            .db
            .load_visits_for_period(ReportSubject::Patient(f.patient_id), period)
            .unwrap();
        assert_eq!(patient_visits.records.len(), 2);
        assert!(patient_visits.issues.is_empty());

        let hygienist_visits = f
            .db
            .load_visits_for_period(ReportSubject::Hygienist(f.hygienist_id), period)
            .unwrap();
        assert_eq!(hygienist_visits.records.len(), 3);

        let all = f.db.load_all_visits_for_period(period).unwrap();
        assert_eq!(all.records.len(), 3);
    }

    #[test]
    fn test_unknown_status_reported_as_issue() {
        let f = setup();
        f.db.insert_visit(&VisitInput::scheduled(f.patient_id, f.hygienist_id, day(2)))
            .unwrap();
        f.db.conn()
            .execute(
                "INSERT INTO visit_records (patient_id, hygienist_id, visit_date, status) VALUES (?1, ?2, '2024-05-04', 'no_show')",
                params![f.patient_id, f.hygienist_id],
            )
            .unwrap();

        let loaded = f
            .db
            .load_visits_for_period(
                ReportSubject::Patient(f.patient_id),
                MonthPeriod::new(2024, 5).unwrap(),
            )
            .unwrap();
        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.issues.len(), 1);
        assert!(loaded.issues[0].problem.contains("no_show"));

        // Direct listing surfaces the same row as an error.
        assert!(matches!(f.db.list_visits(), Err(DbError::InvalidStatus(_))));
    }

    #[test]
    fn test_delete_visit() {
        let f = setup();
        let visit = f
            .db
            .insert_visit(&VisitInput::scheduled(f.patient_id, f.hygienist_id, day(10)))
            .unwrap();
        assert!(f.db.delete_visit(visit.id).unwrap());
        assert!(f.db.get_visit(visit.id).unwrap().is_none());
        assert!(!f.db.delete_visit(visit.id).unwrap());
    }
}
