//! Centralized configuration for dspace-migrate.
//!
//! Constants describing the DSpace schema conventions the tool relies on, plus
//! the JSON run configuration naming the two repositories and report
//! directories.

use crate::error::{MigrateError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    pub const APP_NAME: &'static str = "dspace-migrate";
    pub const CONFIG_DIR_NAME: &'static str = "dspace-migrate";
    pub const CONFIG_FILE_NAME: &'static str = "config.json";
    pub const REPORT_TIMESTAMP_FORMAT: &'static str = "%Y%m%d%H%M%S";
}

/// DSpace schema conventions.
pub struct DspaceConfig;

impl DspaceConfig {
    /// `resource_type_id` used by DSpace for items.
    pub const ITEM_RESOURCE_TYPE: i32 = 2;
    /// Registry id of the Dublin Core schema.
    pub const DC_SCHEMA_ID: i64 = 1;
    pub const TITLE_ELEMENT: &'static str = "title";
    pub const IDENTIFIER_URI_FIELD: &'static str = "dc.identifier.uri";
    pub const TITLE_FIELD: &'static str = "dc.title";
    pub const HANDLE_URI_BASE: &'static str = "http://arks.princeton.edu/ark:/";
}

/// SQLite connection settings.
pub struct SqliteConfig;

impl SqliteConfig {
    pub const BUSY_TIMEOUT_MS: u32 = 30_000;
}

/// One side of the migration (source or destination).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct RepositoryConfig {
    /// Name written into the `database` column of reports.
    pub label: String,
    /// Path to the repository database.
    pub database_path: PathBuf,
}

/// Output location for one kind of report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportConfig {
    pub directory: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
        }
    }
}

/// Run configuration loaded from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct MigrationConfig {
    pub source: RepositoryConfig,
    pub destination: RepositoryConfig,
    #[serde(default)]
    pub migration_reports: ReportConfig,
    #[serde(default)]
    pub metadata_reports: ReportConfig,
}

impl MigrationConfig {
    /// Default location: `<platform config dir>/dspace-migrate/config.json`.
    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::config_dir().ok_or_else(|| MigrateError::Config {
            message: "Could not determine the platform configuration directory".to_string(),
        })?;
        Ok(base
            .join(AppConfig::CONFIG_DIR_NAME)
            .join(AppConfig::CONFIG_FILE_NAME))
    }

    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| MigrateError::io_with_path(e, path))?;
        let config: MigrationConfig =
            serde_json::from_str(&contents).map_err(|e| MigrateError::Config {
                message: format!("Invalid configuration in {}: {}", path.display(), e),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (side, repo) in [("source", &self.source), ("destination", &self.destination)] {
            if repo.label.trim().is_empty() {
                return Err(MigrateError::Validation {
                    field: format!("{side}.label"),
                    message: "must not be empty".to_string(),
                });
            }
            if repo.database_path.as_os_str().is_empty() {
                return Err(MigrateError::Validation {
                    field: format!("{side}.database_path"),
                    message: "must not be empty".to_string(),
                });
            }
        }

        if self.source.database_path == self.destination.database_path {
            return Err(MigrateError::Validation {
                field: "destination.database_path".to_string(),
                message: "source and destination must be different databases".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_json() -> &'static str {
        r#"{
            "source": { "label": "dataspace-legacy", "database_path": "/data/legacy.db" },
            "destination": { "label": "dataspace", "database_path": "/data/dataspace.db" },
            "migration_reports": { "directory": "reports/migrations" }
        }"#
    }

    #[test]
    fn test_load_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(&path, sample_json()).unwrap();

        let config = MigrationConfig::load(&path).unwrap();
        assert_eq!(config.source.label, "dataspace-legacy");
        assert_eq!(
            config.migration_reports.directory,
            PathBuf::from("reports/migrations")
        );
        // Omitted section falls back to the working directory
        assert_eq!(config.metadata_reports.directory, PathBuf::from("."));
    }

    #[test]
    fn test_same_database_rejected() {
        let mut config: MigrationConfig = serde_json::from_str(sample_json()).unwrap();
        config.destination.database_path = config.source.database_path.clone();

        let err = config.validate().unwrap_err();
        assert!(matches!(err, MigrateError::Validation { .. }));
    }

    #[test]
    fn test_empty_label_rejected() {
        let mut config: MigrationConfig = serde_json::from_str(sample_json()).unwrap();
        config.source.label = "  ".to_string();

        match config.validate().unwrap_err() {
            MigrateError::Validation { field, .. } => assert_eq!(field, "source.label"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            MigrationConfig::load(&path),
            Err(MigrateError::Config { .. })
        ));
    }
}
