//! Per-item outcome report of a migration run.

use super::output::{report_file_name, resolve_report_dir, write_report};
use crate::error::{MigrateError, Result};
use crate::migration::{DeletionStatus, MigrationState};
use crate::models::ItemId;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// State column values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportState {
    Migrated,
    Replaced,
    Missing,
    Duplicated,
    Deleted,
    DeleteFailed,
}

impl ReportState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportState::Migrated => "MIGRATED",
            ReportState::Replaced => "REPLACED",
            ReportState::Missing => "MISSING",
            ReportState::Duplicated => "DUPLICATED",
            ReportState::Deleted => "DELETED",
            ReportState::DeleteFailed => "DELETE_FAILED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub item_id: ItemId,
    pub database: String,
    pub state: ReportState,
}

/// Renders a finished [`MigrationState`] as `item_id,database,state` rows.
pub struct MigrationReport<'a> {
    state: &'a MigrationState,
    source_label: &'a str,
    destination_label: &'a str,
}

impl<'a> MigrationReport<'a> {
    pub const KIND: &'static str = "migration_report";

    pub fn new(state: &'a MigrationState, source_label: &'a str, destination_label: &'a str) -> Self {
        Self {
            state,
            source_label,
            destination_label,
        }
    }

    pub fn headers() -> [&'static str; 3] {
        ["item_id", "database", "state"]
    }

    pub fn rows(&self) -> Vec<ReportRow> {
        let row = |item_id: ItemId, database: &str, state: ReportState| ReportRow {
            item_id,
            database: database.to_string(),
            state,
        };

        let mut rows = Vec::new();
        rows.extend(
            self.state
                .migrated_source_items()
                .into_iter()
                .map(|id| row(id, self.source_label, ReportState::Migrated)),
        );
        rows.extend(
            self.state
                .migrated_destination_items()
                .into_iter()
                .map(|id| row(id, self.destination_label, ReportState::Migrated)),
        );
        rows.extend(
            self.state
                .replaced_items()
                .into_iter()
                .map(|id| row(id, self.destination_label, ReportState::Replaced)),
        );
        // Missing and duplicated ids are source ids: they never reached the destination
        rows.extend(
            self.state
                .missing_items()
                .into_iter()
                .map(|id| row(id, self.source_label, ReportState::Missing)),
        );
        rows.extend(
            self.state
                .duplicated_items()
                .into_iter()
                .map(|id| row(id, self.source_label, ReportState::Duplicated)),
        );
        rows.extend(self.state.deletion_statuses().map(|(id, status)| {
            let state = match status {
                DeletionStatus::Deleted => ReportState::Deleted,
                DeletionStatus::DeleteFailed { .. } => ReportState::DeleteFailed,
            };
            row(id, self.destination_label, state)
        }));
        rows
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(Self::headers())?;
        for row in self.rows() {
            writer.write_record([
                row.item_id.to_string().as_str(),
                row.database.as_str(),
                row.state.as_str(),
            ])?;
        }
        let bytes = writer.into_inner().map_err(|e| MigrateError::Csv {
            message: format!("Failed to flush migration report: {}", e),
            source: None,
        })?;
        String::from_utf8(bytes).map_err(|e| MigrateError::Other(e.to_string()))
    }

    /// Write a timestamped report into `directory` and return its path.
    pub fn write_to_dir(&self, directory: &Path) -> Result<PathBuf> {
        let path = resolve_report_dir(directory)?.join(report_file_name(Self::KIND));
        write_report(&path, &self.to_csv()?)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn finished_state() -> MigrationState {
        let mut state = MigrationState::new();
        state.record_migration(ItemId(10), ItemId(501), ItemId(500));
        state.record_migration(ItemId(20), ItemId(502), ItemId(600));
        state.record_missing(ItemId(11));
        state.record_duplicated(ItemId(12));
        state.next_deletion();
        state.next_deletion();
        state.record_deletion(ItemId(500), DeletionStatus::Deleted);
        state.record_deletion(
            ItemId(600),
            DeletionStatus::DeleteFailed {
                reason: "FOREIGN KEY constraint failed".to_string(),
            },
        );
        state
    }

    #[test]
    fn test_rows_cover_every_outcome() {
        let state = finished_state();
        let report = MigrationReport::new(&state, "legacy", "dataspace");
        let rows = report.rows();

        let find = |id: i64, state: ReportState| {
            rows.iter()
                .find(|r| r.item_id == ItemId(id) && r.state == state)
                .map(|r| r.database.clone())
        };

        assert_eq!(find(10, ReportState::Migrated).as_deref(), Some("legacy"));
        assert_eq!(find(501, ReportState::Migrated).as_deref(), Some("dataspace"));
        assert_eq!(find(500, ReportState::Replaced).as_deref(), Some("dataspace"));
        assert_eq!(find(11, ReportState::Missing).as_deref(), Some("legacy"));
        assert_eq!(find(12, ReportState::Duplicated).as_deref(), Some("legacy"));
        assert_eq!(find(500, ReportState::Deleted).as_deref(), Some("dataspace"));
        assert_eq!(find(600, ReportState::DeleteFailed).as_deref(), Some("dataspace"));
        assert!(find(600, ReportState::Deleted).is_none());
        assert_eq!(rows.len(), 10);
    }

    #[test]
    fn test_csv_output() {
        let state = finished_state();
        let csv = MigrationReport::new(&state, "legacy", "dataspace")
            .to_csv()
            .unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("item_id,database,state"));
        assert_eq!(lines.next(), Some("10,legacy,MIGRATED"));
        assert!(csv.contains("600,dataspace,DELETE_FAILED"));
    }

    #[test]
    fn test_write_to_dir() {
        let temp = TempDir::new().unwrap();
        let state = finished_state();
        let path = MigrationReport::new(&state, "legacy", "dataspace")
            .write_to_dir(temp.path())
            .unwrap();

        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .ends_with("_migration_report.csv"));
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("item_id,database,state"));
    }
}
