//! `migrate`: run one migration batch and write the migration report.

use super::{open_repository, parse_filter};
use anyhow::{Context, Result};
use clap::Args;
use dspace_migrate::report::resolve_report_dir;
use dspace_migrate::{MigrationConfig, MigrationJob, MigrationReport};
use serde_json::json;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Metadata field selecting the batch, e.g. dc.date.accessioned
    #[arg(long)]
    pub field: String,

    /// Value the field must hold
    #[arg(long)]
    pub value: String,

    /// Maximum number of source items to migrate
    #[arg(long)]
    pub limit: Option<u32>,

    /// Report directory (overrides migration_reports.directory)
    #[arg(long)]
    pub report_dir: Option<PathBuf>,
}

pub fn execute(args: MigrateArgs, config: &MigrationConfig) -> Result<serde_json::Value> {
    let filter = parse_filter(&args.field, &args.value, args.limit)?;

    // The report directory must exist before anything is migrated
    let report_dir = args
        .report_dir
        .unwrap_or_else(|| config.migration_reports.directory.clone());
    let report_dir = resolve_report_dir(&report_dir)
        .with_context(|| format!("Failed to write the migration report to {}", report_dir.display()))?;

    let source = open_repository(&config.source)?;
    let destination = open_repository(&config.destination)?;

    info!(
        "Migrating from {} to {}",
        config.source.label, config.destination.label
    );
    let state = MigrationJob::new(&source, &destination).run_filtered(&filter)?;

    let failed = state.failed_deletions();
    for (item_id, reason) in &failed {
        warn!("Item {} could not be deleted: {}", item_id, reason);
    }

    let report = MigrationReport::new(&state, &config.source.label, &config.destination.label)
        .write_to_dir(&report_dir)
        .with_context(|| format!("Failed to write the migration report to {}", report_dir.display()))?;
    info!("Wrote {}", report.display());

    Ok(json!({
        "command": "migrate",
        "summary": state.summary(),
        "failed_deletions": failed
            .iter()
            .map(|(item_id, reason)| json!({ "item_id": item_id, "reason": reason }))
            .collect::<Vec<_>>(),
        "report": report,
    }))
}
