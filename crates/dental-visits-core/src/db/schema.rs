//! SQLite schema definition.

/// Complete database schema.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Master Data
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    patient_code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    phone TEXT,
    email TEXT,
    address TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(name);

CREATE TABLE IF NOT EXISTS hygienists (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    staff_code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    license_number TEXT,
    phone TEXT,
    email TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_hygienists_name ON hygienists(name);

-- ============================================================================
-- Visit Records
-- ============================================================================

-- status is validated on read so rows imported from older systems surface
-- as integrity issues in reports instead of failing the insert.
CREATE TABLE IF NOT EXISTS visit_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    patient_id INTEGER NOT NULL REFERENCES patients(id),
    hygienist_id INTEGER NOT NULL REFERENCES hygienists(id),
    visit_date TEXT NOT NULL,                    -- YYYY-MM-DD
    start_time TEXT,                             -- HH:MM
    end_time TEXT,                               -- HH:MM
    status TEXT NOT NULL DEFAULT 'scheduled',    -- scheduled, completed, cancelled
    cancellation_reason TEXT,
    notes TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_visits_date ON visit_records(visit_date);
CREATE INDEX IF NOT EXISTS idx_visits_patient ON visit_records(patient_id, visit_date);
CREATE INDEX IF NOT EXISTS idx_visits_hygienist ON visit_records(hygienist_id, visit_date);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_duplicate_patient_code_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        conn.execute(
            "INSERT INTO patients (patient_code, name) VALUES (?, ?)",
            ["P-1", "Mio"],
        )
        .unwrap();
        let result = conn.execute(
            "INSERT INTO patients (patient_code, name) VALUES (?, ?)",
            ["P-1", "Other"],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_visit_requires_existing_patient() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        conn.execute(
            "INSERT INTO hygienists (staff_code, name) VALUES ('H-1', 'Keiko')",
            [],
        )
        .unwrap();
        let result = conn.execute(
            "INSERT INTO visit_records (patient_id, hygienist_id, visit_date) VALUES (99, 1, '2024-01-01')",
            [],
        );
        assert!(result.is_err());
    }
}
