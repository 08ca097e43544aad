//! CLI command implementations

pub mod init_schema;
pub mod metadata_report;
pub mod migrate;
pub mod update_handles;

use anyhow::{Context, Result};
use dspace_migrate::{MetadataField, MetadataFilter, RepositoryConfig, SqliteRepository};

/// Open the database of one configured repository.
pub(crate) fn open_repository(repo: &RepositoryConfig) -> Result<SqliteRepository> {
    SqliteRepository::open(&repo.database_path)
        .with_context(|| format!("Failed to open the {} repository", repo.label))
}

pub(crate) fn parse_filter(field: &str, value: &str, limit: Option<u32>) -> Result<MetadataFilter> {
    let field: MetadataField = field
        .parse()
        .with_context(|| format!("Invalid metadata field: {}", field))?;
    Ok(MetadataFilter::new(field, value).with_limit(limit))
}
