//! Core configuration, read from TOML.
//!
//! ```toml
//! log_filter = "dental_visits_core=debug"
//!
//! [database]
//! path = "visits.db"
//!
//! [export]
//! include_header = true
//! file_prefix = "clinic"
//! ```
//!
//! Every key is optional.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::{Database, DbError};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Export file prefix may not contain path separators: {0}")]
    InvalidFilePrefix(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub database: DatabaseConfig,
    pub export: ExportConfig,
    /// `tracing` filter directive; `RUST_LOG` applies when unset
    pub log_filter: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file; in-memory when unset
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub include_header: bool,
    pub file_prefix: Option<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            include_header: true,
            file_prefix: None,
        }
    }
}

impl CoreConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: CoreConfig = toml::from_str(s).context("Failed to parse core config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(prefix) = &self.export.file_prefix {
            if prefix.contains(['/', '\\']) {
                return Err(ConfigError::InvalidFilePrefix(prefix.clone()));
            }
        }
        Ok(())
    }

    /// Open the configured database.
    pub fn open_database(&self) -> Result<Database, ConfigError> {
        let db = match &self.database.path {
            Some(path) => Database::open(path)?,
            None => Database::open_in_memory()?,
        };
        Ok(db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PatientInput;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = CoreConfig::from_toml_str("").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert!(config.export.include_header);
        assert!(config.database.path.is_none());
    }

    #[test]
    fn test_partial_sections() {
        let config = CoreConfig::from_toml_str(
            r#"
            log_filter = "debug"

            [export]
            file_prefix = "clinic"
            "#,
        )
        .unwrap();
        assert_eq!(config.log_filter.as_deref(), Some("debug"));
        assert_eq!(config.export.file_prefix.as_deref(), Some("clinic"));
        assert!(config.export.include_header);
    }

    #[test]
    fn test_rejects_bad_prefix() {
        let err = CoreConfig::from_toml_str("[export]\nfile_prefix = \"../x\"").unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }

    #[test]
    fn test_rejects_malformed_toml() {
        assert!(CoreConfig::from_toml_str("[database\npath = 1").is_err());
    }

    #[test]
    fn test_load_and_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("visits.db");
        let config_path = dir.path().join("core.toml");

        let mut file = fs::File::create(&config_path).unwrap();
        writeln!(file, "[database]\npath = {:?}", db_path.to_string_lossy()).unwrap();

        let config = CoreConfig::load(&config_path).unwrap();
        assert_eq!(config.database.path.as_deref(), Some(db_path.as_path()));

        {
            let db = config.open_database().unwrap();
            db.insert_patient(&PatientInput::new("P-1", "Hanako")).unwrap();
        }
        let reopened = config.open_database().unwrap();
        assert_eq!(reopened.list_patients().unwrap().len(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CoreConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
