//! Migration reconciliation engine.
//!
//! Walks the source rows in order and, for every source item, finds the one
//! destination item it supersedes (by exact title), creates the replacement,
//! copies the metadata row by row and moves the superseded item's relations
//! over to the replacement. Superseded items are only queued here; removing
//! them is the deletion processor's job once every row has been handled.

use super::state::MigrationState;
use crate::error::Result;
use crate::models::{ItemId, SourceRow};
use crate::store::RepositoryStore;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// How the candidate lists of several titles are combined.
///
/// Each title of a source item is probed separately. A later title with a
/// non-empty result replaces whatever an earlier title found; empty results
/// never clear an earlier one. Items whose titles point at different
/// destination items therefore resolve to the candidates of their last
/// matching title. This mirrors the behaviour operators have been relying on
/// and is kept until a rule for conflicting titles is agreed.
pub const TITLE_CANDIDATES_RULE: &str = "last-non-empty-wins";

/// Result of matching a source item's titles against the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleMatch {
    Unique(ItemId),
    Missing,
    Duplicated(Vec<ItemId>),
}

/// What happened to one source row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    /// The item was already recorded as missing or duplicated.
    Skipped,
    Missing,
    Duplicated,
    Migrated {
        new_id: ItemId,
        matched_id: ItemId,
        /// False when the destination did not know the row's metadata field.
        metadata_inserted: bool,
    },
}

/// Combine per-title candidate lists using [`TITLE_CANDIDATES_RULE`].
pub fn merge_title_candidates<I>(results: I) -> Vec<ItemId>
where
    I: IntoIterator<Item = Vec<ItemId>>,
{
    let mut candidates = Vec::new();
    for result in results {
        if !result.is_empty() {
            if !candidates.is_empty() && candidates != result {
                debug!(
                    "Title candidates {:?} replaced by {:?} ({})",
                    candidates, result, TITLE_CANDIDATES_RULE
                );
            }
            candidates = result;
        }
    }
    candidates
}

/// The reconciliation engine, borrowing one store per side.
pub struct MigrationEngine<'a, S: ?Sized, D: ?Sized> {
    source: &'a S,
    destination: &'a D,
}

impl<'a, S, D> MigrationEngine<'a, S, D>
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

    /// Run the migration phase over `rows` and return the resulting state.
    ///
    /// Store failures other than an unregistered metadata field abort the run;
    /// whatever was written before the failure stays written. Metadata inserts
    /// are not deduplicated, so rerunning a batch can duplicate values.
    pub fn perform<I>(&self, rows: I) -> Result<MigrationState>
    where
        I: IntoIterator<Item = SourceRow>,
    {
        let mut state = MigrationState::new();
        let mut processed = 0usize;

        for row in rows {
            self.migrate_row(&mut state, &row)?;
            processed += 1;
        }

        let summary = state.summary();
        info!(
            "Processed {} rows: {} items migrated, {} missing, {} duplicated, {} queued for deletion",
            processed,
            summary.migrated,
            summary.missing,
            summary.duplicated,
            summary.pending_deletions
        );
        Ok(state)
    }

    /// Process a single row against `state`.
    pub fn migrate_row(&self, state: &mut MigrationState, row: &SourceRow) -> Result<RowOutcome> {
        let source_id = row.item_id;
        if state.is_skipped(source_id) {
            return Ok(RowOutcome::Skipped);
        }

        let matched_id = match state.replacement_for(source_id) {
            Some(matched_id) => matched_id,
            None => match self.match_titles(source_id)? {
                TitleMatch::Unique(matched_id) => {
                    state.record_replacement(source_id, matched_id);
                    matched_id
                }
                TitleMatch::Missing => {
                    state.record_missing(source_id);
                    return Ok(RowOutcome::Missing);
                }
                TitleMatch::Duplicated(_) => {
                    state.record_duplicated(source_id);
                    return Ok(RowOutcome::Duplicated);
                }
            },
        };

        let new_id = self.resolve_migration(state, row, matched_id)?;
        let metadata_inserted = self.insert_metadata(row, new_id)?;

        if state.begin_relink(new_id, matched_id) {
            self.relink(row, new_id, matched_id)?;
        }

        Ok(RowOutcome::Migrated {
            new_id,
            matched_id,
            metadata_inserted,
        })
    }

    /// Match the source item's titles against destination titles.
    pub fn match_titles(&self, source_id: ItemId) -> Result<TitleMatch> {
        let titles = self.source.find_titles_by_item(source_id)?;

        let mut results = Vec::with_capacity(titles.len());
        for title in &titles {
            results.push(self.destination.find_items_by_title(title)?);
        }
        let candidates = merge_title_candidates(results);

        Ok(match candidates.len() {
            0 => {
                warn!(
                    "Failed to find the matching Item for {} using the titles: {}. Skipping the import...",
                    source_id,
                    titles.join(", ")
                );
                TitleMatch::Missing
            }
            1 => TitleMatch::Unique(candidates[0]),
            _ => {
                warn!(
                    "Found multiple matching Items for {} using the titles: {}. Skipping the import...",
                    source_id,
                    titles.join(", ")
                );
                TitleMatch::Duplicated(candidates)
            }
        })
    }

    fn resolve_migration(
        &self,
        state: &mut MigrationState,
        row: &SourceRow,
        matched_id: ItemId,
    ) -> Result<ItemId> {
        let source_id = row.item_id;
        if let Some(new_id) = state.migration_for(source_id) {
            debug!("Updating {}...", source_id);
            return Ok(new_id);
        }

        info!("Importing {}...", source_id);
        let new_id = self.destination.next_item_id()?;
        info!("Creating a new Item for {}...", source_id);
        self.destination.create_item(&row.to_new_item(new_id))?;
        state.record_migration(source_id, new_id, matched_id);
        info!("Created {}...", new_id);

        Ok(new_id)
    }

    fn insert_metadata(&self, row: &SourceRow, new_id: ItemId) -> Result<bool> {
        match self.destination.insert_metadata(&row.to_metadata_value(new_id)) {
            Ok(()) => {
                info!(
                    "Created metadata value for {}: {}: {}...",
                    new_id,
                    row.field_name(),
                    row.text_value.as_deref().unwrap_or("")
                );
                Ok(true)
            }
            Err(e) if e.is_recoverable_metadata_failure() => {
                warn!(
                    "Skipping metadata value {} for {}: {}",
                    row.field_name(),
                    new_id,
                    e
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Move every relation of `matched_id` over to `new_id`.
    fn relink(&self, row: &SourceRow, new_id: ItemId, matched_id: ItemId) -> Result<()> {
        let destination = self.destination;

        // Community and collection ids are shared between the two repositories
        let mut communities = HashSet::new();
        let mut collections = HashSet::new();
        self.source
            .community_memberships(row.item_id, &mut |membership| {
                if communities.insert(membership.community_id) {
                    destination.relink_community(new_id, matched_id, membership.community_id)?;
                    info!(
                        "Updated the community membership for {} from {}...",
                        new_id, matched_id
                    );
                }
                if collections.insert(membership.collection_id) {
                    destination.relink_collection(new_id, matched_id, membership.collection_id)?;
                    info!(
                        "Updated the collection membership for {} from {}...",
                        new_id, matched_id
                    );
                }
                Ok(())
            })?;

        destination.relink_policies(new_id, matched_id)?;
        info!("Updated the Item authorization policies for {}...", new_id);

        let mut bundles = HashSet::new();
        destination.bundle_associations(matched_id, &mut |association| {
            if bundles.insert(association.bundle_id) {
                destination.relink_bundle(new_id, matched_id, association.bundle_id)?;
                info!("Updated the bundle for {} from {}...", new_id, matched_id);
            }
            Ok(())
        })?;

        destination.relink_handle(new_id, matched_id, row.handle.as_deref())?;
        info!("Updated the handles for {}...", new_id);

        destination.relink_workflow_item(new_id, matched_id)?;
        info!("Updated the workflow items for {}...", new_id);

        destination.relink_workspace_item(new_id, matched_id)?;
        info!("Updated the workspace items for {}...", new_id);

        Ok(())
    }
}
