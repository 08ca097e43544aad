//! CSV reports written after a run.

mod metadata_report;
mod migration_report;
mod output;

pub use metadata_report::MetadataReport;
pub use migration_report::{MigrationReport, ReportRow, ReportState};
pub use output::{report_file_name, resolve_report_dir, write_report};
