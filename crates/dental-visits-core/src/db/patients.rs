//! Patient database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{like_prefix, now_timestamp, Database, DbError, DbResult};
use crate::models::{Patient, PatientInput, PatientPatch};

const PATIENT_COLUMNS: &str =
    "id, patient_code, name, phone, email, address, created_at, updated_at";

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        patient_code: row.get(1)?,
        name: row.get(2)?,
        phone: row.get(3)?,
        email: row.get(4)?,
        address: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

impl Database {
    /// Register a new patient.
    pub fn insert_patient(&self, input: &PatientInput) -> DbResult<Patient> {
        if self.get_patient_by_code(&input.patient_code)?.is_some() {
            return Err(DbError::Constraint(format!(
                "Patient code already exists: {}",
                input.patient_code
            )));
        }

        let now = now_timestamp();
        self.conn.execute(
            r#"
            INSERT INTO patients (
                patient_code, name, phone, email, address, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                input.patient_code,
                input.name,
                input.phone,
                input.email,
                input.address,
                now,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(patient_id = id, code = %input.patient_code, "patient registered");

        self.get_patient(id)?
            .ok_or_else(|| DbError::NotFound(format!("patient {}", id)))
    }

    /// Apply a partial update to a patient.
    pub fn update_patient(&self, id: i64, patch: &PatientPatch) -> DbResult<Patient> {
        let mut patient = self
            .get_patient(id)?
            .ok_or_else(|| DbError::NotFound(format!("patient {}", id)))?;

        if let Some(code) = &patch.patient_code {
            if let Some(other) = self.get_patient_by_code(code)? {
                if other.id != id {
                    return Err(DbError::Constraint(format!(
                        "Patient code already exists: {}",
                        code
                    )));
                }
            }
        }

        patient.apply(patch);
        patient.updated_at = now_timestamp();

        self.conn.execute(
            r#"
            UPDATE patients SET
                patient_code = ?2,
                name = ?3,
                phone = ?4,
                email = ?5,
                address = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
            params![
                patient.id,
                patient.patient_code,
                patient.name,
                patient.phone,
                patient.email,
                patient.address,
                patient.updated_at,
            ],
        )?;
        tracing::info!(patient_id = id, "patient updated");
        Ok(patient)
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, id: i64) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM patients WHERE id = ?", PATIENT_COLUMNS),
                [id],
                patient_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get a patient by external code.
    pub fn get_patient_by_code(&self, patient_code: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM patients WHERE patient_code = ?",
                    PATIENT_COLUMNS
                ),
                [patient_code],
                patient_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Search patients by name or code (prefix match).
    pub fn search_patients(&self, query: &str, limit: usize) -> DbResult<Vec<Patient>> {
        let pattern = like_prefix(query);
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM patients
            WHERE name LIKE ?1 ESCAPE '\' OR patient_code LIKE ?1 ESCAPE '\'
            ORDER BY patient_code
            LIMIT ?2
            "#,
            PATIENT_COLUMNS
        ))?;

        let rows = stmt.query_map(params![pattern, limit as i64], patient_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// List all patients, ordered by code.
    pub fn list_patients(&self) -> DbResult<Vec<Patient>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM patients ORDER BY patient_code",
            PATIENT_COLUMNS
        ))?;

        let rows = stmt.query_map([], patient_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Delete a patient. Patients with visit records cannot be deleted.
    pub fn delete_patient(&self, id: i64) -> DbResult<bool> {
        let visits: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM visit_records WHERE patient_id = ?",
            [id],
            |row| row.get(0),
        )?;
        if visits > 0 {
            return Err(DbError::Constraint(format!(
                "patient {} has {} visit record(s)",
                id, visits
            )));
        }

        let rows_affected = self
            .conn
            .execute("DELETE FROM patients WHERE id = ?", [id])?;
        if rows_affected > 0 {
            tracing::info!(patient_id = id, "patient deleted");
        }
        Ok(rows_affected > 0)
    }
}
