//! `metadata-report`: export selected fields of a source batch as CSV.

use super::{open_repository, parse_filter};
use anyhow::{Context, Result};
use clap::Args;
use dspace_migrate::{MetadataField, MetadataReport, MigrationConfig, RepositoryStore};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug)]
pub struct MetadataReportArgs {
    /// Metadata field selecting the batch
    #[arg(long)]
    pub field: String,

    /// Value the field must hold
    #[arg(long)]
    pub value: String,

    /// Report columns, comma separated (schema.element[.qualifier])
    #[arg(long, value_delimiter = ',', required = true)]
    pub columns: Vec<String>,

    /// Maximum number of source items
    #[arg(long)]
    pub limit: Option<u32>,

    /// Output file (defaults to a timestamped file in metadata_reports.directory)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub fn execute(args: MetadataReportArgs, config: &MigrationConfig) -> Result<serde_json::Value> {
    let filter = parse_filter(&args.field, &args.value, args.limit)?;
    let fields = args
        .columns
        .iter()
        .map(|column| {
            column
                .parse::<MetadataField>()
                .with_context(|| format!("Invalid report column: {}", column))
        })
        .collect::<Result<Vec<_>>>()?;

    let source = open_repository(&config.source)?;
    let rows = source.select_item_rows(&filter)?;
    let report = MetadataReport::new(fields);
    let items = report.rows(&rows).len();

    let path = match args.output {
        Some(path) => {
            report.write_to_path(&path, &rows)?;
            path
        }
        None => report.write_to_dir(&config.metadata_reports.directory, &rows)?,
    };
    info!("Wrote {} items to {}", items, path.display());

    Ok(json!({
        "command": "metadata-report",
        "items": items,
        "report": path,
    }))
}
