//! Report file naming and placement.

use crate::config::AppConfig;
use crate::error::{MigrateError, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};

/// `<UTC timestamp>_<kind>.csv`, e.g. `20240105131500_migration_report.csv`.
pub fn report_file_name(kind: &str) -> String {
    format!(
        "{}_{}.csv",
        Utc::now().format(AppConfig::REPORT_TIMESTAMP_FORMAT),
        kind
    )
}

/// Canonicalize a configured report directory. The directory must exist.
pub fn resolve_report_dir(directory: &Path) -> Result<PathBuf> {
    let resolved = directory
        .canonicalize()
        .map_err(|e| MigrateError::io_with_path(e, directory))?;
    if !resolved.is_dir() {
        return Err(MigrateError::Config {
            message: format!("Report directory is not a directory: {}", resolved.display()),
        });
    }
    Ok(resolved)
}

pub fn write_report(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).map_err(|e| MigrateError::io_with_path(e, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_report_file_name() {
        let name = report_file_name("migration_report");
        assert!(name.ends_with("_migration_report.csv"));
        let stamp = name.split('_').next().unwrap();
        assert_eq!(stamp.len(), 14);
        assert!(stamp.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_resolve_report_dir() {
        let temp = TempDir::new().unwrap();
        assert!(resolve_report_dir(temp.path()).is_ok());
        assert!(resolve_report_dir(&temp.path().join("missing")).is_err());
    }
}
