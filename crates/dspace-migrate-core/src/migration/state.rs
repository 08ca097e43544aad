//! Per-run migration state.

use crate::models::ItemId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

/// Outcome of draining one queued item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeletionStatus {
    Deleted,
    /// The item was processed but its row is still there.
    DeleteFailed { reason: String },
}

impl DeletionStatus {
    pub fn is_deleted(&self) -> bool {
        matches!(self, DeletionStatus::Deleted)
    }
}

/// Everything a run learns and decides, keyed by source item id unless noted.
///
/// Created empty for each run, grown by the engine, drained by the deletion
/// processor, then handed to the reports. Nothing here is shared between runs.
#[derive(Debug, Default, Clone)]
pub struct MigrationState {
    /// source item id -> newly created destination item id
    pub(crate) migrations: BTreeMap<ItemId, ItemId>,
    /// source item id -> matched (superseded) destination item id
    pub(crate) replacements: BTreeMap<ItemId, ItemId>,
    pub(crate) missing_items: BTreeSet<ItemId>,
    pub(crate) duplicated_items: BTreeSet<ItemId>,
    /// Destination ids awaiting deletion, FIFO.
    pub(crate) deletion_queue: VecDeque<ItemId>,
    /// Every destination id ever enqueued; guards against enqueueing twice.
    pub(crate) enqueued: HashSet<ItemId>,
    /// (new id, matched id) pairs whose relations have been copied.
    pub(crate) relinked_pairs: HashSet<(ItemId, ItemId)>,
    /// Destination ids the deletion pass has handled, with the result.
    pub(crate) deleted_items: BTreeMap<ItemId, DeletionStatus>,
}

impl MigrationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the source item was skipped for a missing or ambiguous match.
    pub fn is_skipped(&self, source_id: ItemId) -> bool {
        self.missing_items.contains(&source_id) || self.duplicated_items.contains(&source_id)
    }

    pub fn migrated(&self, source_id: ItemId) -> bool {
        self.migrations.contains_key(&source_id)
    }

    pub fn replaced(&self, source_id: ItemId) -> bool {
        self.replacements.contains_key(&source_id)
    }

    /// Whether the deletion pass handled this destination id (successfully or not).
    pub fn deleted(&self, destination_id: ItemId) -> bool {
        self.deleted_items.contains_key(&destination_id)
    }

    pub fn migration_for(&self, source_id: ItemId) -> Option<ItemId> {
        self.migrations.get(&source_id).copied()
    }

    pub fn replacement_for(&self, source_id: ItemId) -> Option<ItemId> {
        self.replacements.get(&source_id).copied()
    }

    pub fn migrated_source_items(&self) -> Vec<ItemId> {
        self.migrations.keys().copied().collect()
    }

    pub fn migrated_destination_items(&self) -> Vec<ItemId> {
        self.migrations.values().copied().collect()
    }

    /// Matched destination ids of migrated items, without repeats.
    pub fn replaced_items(&self) -> Vec<ItemId> {
        let mut seen = HashSet::new();
        self.migrations
            .keys()
            .filter_map(|source| self.replacements.get(source).copied())
            .filter(|matched| seen.insert(*matched))
            .collect()
    }

    pub fn missing_items(&self) -> Vec<ItemId> {
        self.missing_items.iter().copied().collect()
    }

    pub fn duplicated_items(&self) -> Vec<ItemId> {
        self.duplicated_items.iter().copied().collect()
    }

    /// Destination ids the deletion pass handled, whatever the outcome.
    pub fn deleted_items(&self) -> Vec<ItemId> {
        self.deleted_items.keys().copied().collect()
    }

    /// Handled ids whose item row could not be removed, with the reason.
    pub fn failed_deletions(&self) -> Vec<(ItemId, String)> {
        self.deleted_items
            .iter()
            .filter_map(|(id, status)| match status {
                DeletionStatus::DeleteFailed { reason } => Some((*id, reason.clone())),
                DeletionStatus::Deleted => None,
            })
            .collect()
    }

    pub fn deletion_status(&self, destination_id: ItemId) -> Option<&DeletionStatus> {
        self.deleted_items.get(&destination_id)
    }

    pub fn deletion_statuses(&self) -> impl Iterator<Item = (ItemId, &DeletionStatus)> {
        self.deleted_items.iter().map(|(id, status)| (*id, status))
    }

    /// Ids still waiting for the deletion pass, in queue order.
    pub fn pending_deletions(&self) -> Vec<ItemId> {
        self.deletion_queue.iter().copied().collect()
    }

    pub fn summary(&self) -> MigrationSummary {
        let failed = self
            .deleted_items
            .values()
            .filter(|status| !status.is_deleted())
            .count();
        MigrationSummary {
            migrated: self.migrations.len(),
            replaced: self.replaced_items().len(),
            missing: self.missing_items.len(),
            duplicated: self.duplicated_items.len(),
            deleted: self.deleted_items.len() - failed,
            delete_failed: failed,
            pending_deletions: self.deletion_queue.len(),
        }
    }

    pub(crate) fn record_missing(&mut self, source_id: ItemId) {
        self.missing_items.insert(source_id);
    }

    pub(crate) fn record_duplicated(&mut self, source_id: ItemId) {
        self.duplicated_items.insert(source_id);
    }

    pub(crate) fn record_replacement(&mut self, source_id: ItemId, matched_id: ItemId) {
        self.replacements.insert(source_id, matched_id);
    }

    /// Record a created item and queue its predecessor for deletion.
    pub(crate) fn record_migration(&mut self, source_id: ItemId, new_id: ItemId, matched_id: ItemId) {
        self.migrations.insert(source_id, new_id);
        self.replacements.insert(source_id, matched_id);
        if self.enqueued.insert(matched_id) {
            self.deletion_queue.push_back(matched_id);
        }
    }

    /// Returns true the first time a (new, matched) pair is seen.
    pub(crate) fn begin_relink(&mut self, new_id: ItemId, matched_id: ItemId) -> bool {
        self.relinked_pairs.insert((new_id, matched_id))
    }

    pub(crate) fn next_deletion(&mut self) -> Option<ItemId> {
        self.deletion_queue.pop_front()
    }

    pub(crate) fn record_deletion(&mut self, destination_id: ItemId, status: DeletionStatus) {
        self.deleted_items.insert(destination_id, status);
    }
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationSummary {
    pub migrated: usize,
    pub replaced: usize,
    pub missing: usize,
    pub duplicated: usize,
    pub deleted: usize,
    pub delete_failed: usize,
    pub pending_deletions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matched_id_enqueued_once() {
        let mut state = MigrationState::new();
        state.record_migration(ItemId(10), ItemId(501), ItemId(500));
        state.record_migration(ItemId(11), ItemId(502), ItemId(500));

        assert_eq!(state.pending_deletions(), vec![ItemId(500)]);
        assert_eq!(state.replaced_items(), vec![ItemId(500)]);
        assert_eq!(
            state.migrated_destination_items(),
            vec![ItemId(501), ItemId(502)]
        );
    }

    #[test]
    fn test_begin_relink_once_per_pair() {
        let mut state = MigrationState::new();
        assert!(state.begin_relink(ItemId(501), ItemId(500)));
        assert!(!state.begin_relink(ItemId(501), ItemId(500)));
        assert!(state.begin_relink(ItemId(502), ItemId(500)));
    }

    #[test]
    fn test_skip_sets() {
        let mut state = MigrationState::new();
        state.record_missing(ItemId(11));
        state.record_duplicated(ItemId(12));

        assert!(state.is_skipped(ItemId(11)));
        assert!(state.is_skipped(ItemId(12)));
        assert!(!state.is_skipped(ItemId(10)));
        assert!(!state.migrated(ItemId(11)));
    }

    #[test]
    fn test_summary_separates_failed_deletions() {
        let mut state = MigrationState::new();
        state.record_migration(ItemId(10), ItemId(501), ItemId(500));
        state.record_migration(ItemId(20), ItemId(502), ItemId(600));
        state.record_missing(ItemId(11));

        while let Some(id) = state.next_deletion() {
            let status = if id == ItemId(500) {
                DeletionStatus::Deleted
            } else {
                DeletionStatus::DeleteFailed {
                    reason: "still referenced".to_string(),
                }
            };
            state.record_deletion(id, status);
        }

        let summary = state.summary();
        assert_eq!(summary.migrated, 2);
        assert_eq!(summary.missing, 1);
        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.delete_failed, 1);
        assert_eq!(summary.pending_deletions, 0);

        assert_eq!(state.deleted_items(), vec![ItemId(500), ItemId(600)]);
        assert_eq!(
            state.failed_deletions(),
            vec![(ItemId(600), "still referenced".to_string())]
        );
    }
}
