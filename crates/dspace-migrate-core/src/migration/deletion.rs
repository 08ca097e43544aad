//! Deletion queue processor.
//!
//! Second phase of a run: removes the destination items superseded during the
//! migration phase. Failures are logged and recorded per item, never raised.

use super::state::{DeletionStatus, MigrationState};
use crate::models::ItemId;
use crate::store::RepositoryStore;
use tracing::{error, info, warn};

/// Drains the deletion queue of a finished migration phase.
pub struct DeletionQueueProcessor<'a, D: ?Sized> {
    destination: &'a D,
}

impl<'a, D> DeletionQueueProcessor<'a, D>
where
    D: RepositoryStore + ?Sized,
{
    pub fn new(destination: &'a D) -> Self {
        Self { destination }
    }

    /// Delete every queued item in FIFO order and return the updated state.
    ///
    /// Each id ends up in `deleted_items` whether or not its row disappeared;
    /// the recorded [`DeletionStatus`] tells the two apart.
    pub fn drain(&self, mut state: MigrationState) -> MigrationState {
        let mut handled = 0usize;

        while let Some(item_id) = state.next_deletion() {
            if state.deleted(item_id) {
                continue;
            }
            let status = self.delete(item_id);
            state.record_deletion(item_id, status);
            handled += 1;
        }

        let summary = state.summary();
        info!(
            "Deletion pass handled {} items: {} deleted, {} failed",
            handled, summary.deleted, summary.delete_failed
        );
        state
    }

    fn delete(&self, item_id: ItemId) -> DeletionStatus {
        info!("Deleting the old metadata values for {}...", item_id);
        if let Err(e) = self.destination.delete_metadata(item_id) {
            warn!("Failed to delete the metadata values of {}: {}", item_id, e);
        }

        info!("Deleting the replaced Item {}...", item_id);
        match self.destination.delete_item(item_id) {
            Ok(()) => DeletionStatus::Deleted,
            Err(e) => {
                error!("Failed to delete Item {}: {}", item_id, e);
                DeletionStatus::DeleteFailed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
