//! Two-phase migration job: migrate every row, then delete what was superseded.

use super::deletion::DeletionQueueProcessor;
use super::engine::MigrationEngine;
use super::state::MigrationState;
use crate::error::Result;
use crate::models::{MetadataFilter, SourceRow};
use crate::store::RepositoryStore;
use tracing::info;

/// Runs one migration batch between a source and a destination store.
pub struct MigrationJob<'a, S: ?Sized, D: ?Sized> {
    source: &'a S,
    destination: &'a D,
}

impl<'a, S, D> MigrationJob<'a, S, D>
where
    S: RepositoryStore + ?Sized,
    D: RepositoryStore + ?Sized,
{
    pub fn new(source: &'a S, destination: &'a D) -> Self {
        Self {
            source,
            destination,
        }
    }

    /// Migrate the given rows, then drain the deletion queue.
    ///
    /// Deletion only starts once every row has been processed; if the
    /// migration phase fails nothing is deleted.
    pub fn run<I>(&self, rows: I) -> Result<MigrationState>
    where
        I: IntoIterator<Item = SourceRow>,
    {
        let state = MigrationEngine::new(self.source, self.destination).perform(rows)?;
        Ok(DeletionQueueProcessor::new(self.destination).drain(state))
    }

    /// Select the source rows matching `filter` and run them.
    pub fn run_filtered(&self, filter: &MetadataFilter) -> Result<MigrationState> {
        let rows = self.source.select_item_rows(filter)?;
        info!(
            "Migrating items with {} = {} ({} metadata rows)",
            filter.field,
            filter.value,
            rows.len()
        );
        self.run(rows)
    }
}
