//! Database layer for dental visit tracking.
//!
//! [`Database`] is the store handle. It is created by its owner (a test, the
//! FFI facade, a host process) and passed by reference to whatever needs it.

mod hygienists;
mod patients;
mod schema;
mod visits;

#[allow(unused_imports)]
pub use hygienists::*;
#[allow(unused_imports)]
pub use patients::*;
pub use schema::*;
pub use visits::*;

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

use crate::models::{UnknownStatus, VisitError};

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Invalid visit record: {0}")]
    InvalidVisit(#[from] VisitError),

    #[error("{0}")]
    InvalidStatus(#[from] UnknownStatus),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "opened visit database");
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database.
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

pub(crate) fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Prefix pattern for `LIKE ... ESCAPE '\'`, with `%`, `_` and `\` taken literally.
pub(crate) fn like_prefix(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 1);
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_schema_initialized() {
        let db = Database::open_in_memory().unwrap();

        let tables: Vec<String> = db
            .conn()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"patients".to_string()));
        assert!(tables.contains(&"hygienists".to_string()));
        assert!(tables.contains(&"visit_records".to_string()));
    }

    #[test]
    fn test_open_file_persists_between_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("visits.db");

        {
            let db = Database::open(&path).unwrap();
            db.insert_patient(&crate::models::PatientInput::new("P-1", "Mio Sato"))
                .unwrap();
        }

        let db = Database::open(&path).unwrap();
        let patients = db.list_patients().unwrap();
        assert_eq!(patients.len(), 1);
        assert_eq!(patients[0].name, "Mio Sato");
    }

    #[test]
    fn test_like_prefix_escapes_wildcards() {
        assert_eq!(like_prefix("Yama"), "Yama%");
        assert_eq!(like_prefix("%"), "\\%%");
        assert_eq!(like_prefix("P_1"), "P\\_1%");
        assert_eq!(like_prefix("a\\b"), "a\\\\b%");
    }
}
