//! Hygienist database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{like_prefix, now_timestamp, Database, DbError, DbResult};
use crate::models::{Hygienist, HygienistInput, HygienistPatch};

const HYGIENIST_COLUMNS: &str =
    "id, staff_code, name, license_number, phone, email, created_at, updated_at";

fn hygienist_from_row(row: &Row<'_>) -> rusqlite::Result<Hygienist> {
    Ok(Hygienist {
        id: row.get(0)?,
        staff_code: row.get(1)?,
        name: row.get(2)?,
        license_number: row.get(3)?,
        phone: row.get(4)?,
        email: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

impl Database {
    /// Register a new hygienist.
    pub fn insert_hygienist(&self, input: &HygienistInput) -> DbResult<Hygienist> {
        if self.get_hygienist_by_code(&input.staff_code)?.is_some() {
            return Err(DbError::Constraint(format!(
                "Staff code already exists: {}",
                input.staff_code
            )));
        }

        let now = now_timestamp();
        self.conn.execute(
            r#"
            INSERT INTO hygienists (
                staff_code, name, license_number, phone, email, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                input.staff_code,
                input.name,
                input.license_number,
                input.phone,
                input.email,
                now,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(hygienist_id = id, code = %input.staff_code, "hygienist registered");

        self.get_hygienist(id)?
            .ok_or_else(|| DbError::NotFound(format!("hygienist {}", id)))
    }

    /// Apply a partial update to a hygienist.
    pub fn update_hygienist(&self, id: i64, patch: &HygienistPatch) -> DbResult<Hygienist> {
        let mut hygienist = self
            .get_hygienist(id)?
            .ok_or_else(|| DbError::NotFound(format!("hygienist {}", id)))?;

        if let Some(code) = &patch.staff_code {
            if let Some(other) = self.get_hygienist_by_code(code)? {
                if other.id != id {
                    return Err(DbError::Constraint(format!(
                        "Staff code already exists: {}",
                        code
                    )));
                }
            }
        }

        hygienist.apply(patch);
        hygienist.updated_at = now_timestamp();

        self.conn.execute(
            r#"
            UPDATE hygienists SET
                staff_code = ?2,
                name = ?3,
                license_number = ?4,
                phone = ?5,
                email = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
            params![
                hygienist.id,
                hygienist.staff_code,
                hygienist.name,
                hygienist.license_number,
                hygienist.phone,
                hygienist.email,
                hygienist.updated_at,
            ],
        )?;
        tracing::info!(hygienist_id = id, "hygienist updated");
        Ok(hygienist)
    }

    /// Get a hygienist by ID.
    pub fn get_hygienist(&self, id: i64) -> DbResult<Option<Hygienist>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM hygienists WHERE id = ?", HYGIENIST_COLUMNS),
                [id],
                hygienist_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get a hygienist by staff code.
    pub fn get_hygienist_by_code(&self, staff_code: &str) -> DbResult<Option<Hygienist>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM hygienists WHERE staff_code = ?",
                    HYGIENIST_COLUMNS
                ),
                [staff_code],
                hygienist_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Search hygienists by name or staff code (prefix match).
    pub fn search_hygienists(&self, query: &str, limit: usize) -> DbResult<Vec<Hygienist>> {
        let pattern = like_prefix(query);
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM hygienists
            WHERE name LIKE ?1 ESCAPE '\' OR staff_code LIKE ?1 ESCAPE '\'
            ORDER BY staff_code
            LIMIT ?2
            "#,
            HYGIENIST_COLUMNS
        ))?;

        let rows = stmt.query_map(params![pattern, limit as i64], hygienist_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// List all hygienists, ordered by staff code.
    pub fn list_hygienists(&self) -> DbResult<Vec<Hygienist>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM hygienists ORDER BY staff_code",
            HYGIENIST_COLUMNS
        ))?;

        let rows = stmt.query_map([], hygienist_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Delete a hygienist. Hygienists with visit records cannot be deleted.
    pub fn delete_hygienist(&self, id: i64) -> DbResult<bool> {
        let visits: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM visit_records WHERE hygienist_id = ?",
            [id],
            |row| row.get(0),
        )?;
        if visits > 0 {
            return Err(DbError::Constraint(format!(
                "hygienist {} has {} visit record(s)",
                id, visits
            )));
        }

        let rows_affected = self
            .conn
            .execute("DELETE FROM hygienists WHERE id = ?", [id])?;
        if rows_affected > 0 {
            tracing::info!(hygienist_id = id, "hygienist deleted");
        }
        Ok(rows_affected > 0)
    }
}
