//! `init-schema`: create the repository tables in a new or empty database.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use dspace_migrate::{MigrationConfig, SqliteRepository};
use serde_json::json;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Side {
    Source,
    Destination,
}

#[derive(Args, Debug)]
pub struct InitSchemaArgs {
    /// Which configured repository to initialize
    #[arg(long, value_enum)]
    pub side: Side,
}

pub fn execute(args: InitSchemaArgs, config: &MigrationConfig) -> Result<serde_json::Value> {
    let repo = match args.side {
        Side::Source => &config.source,
        Side::Destination => &config.destination,
    };

    info!(
        "Initializing the {} repository schema at {}",
        repo.label,
        repo.database_path.display()
    );
    SqliteRepository::create(&repo.database_path).with_context(|| {
        format!(
            "Failed to initialize {}",
            repo.database_path.display()
        )
    })?;

    Ok(json!({
        "command": "init-schema",
        "label": repo.label,
        "database": repo.database_path,
    }))
}
