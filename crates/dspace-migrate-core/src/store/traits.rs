//! Repository store contracts.

use crate::error::Result;
use crate::models::{
    BundleAssociation, CommunityMembership, ItemId, MetadataFilter, NewItem, NewMetadataValue,
    SourceRow,
};

/// Callback receiving one row of a streamed association read.
///
/// Returning an error stops the stream and propagates out of the read.
pub type Visit<'a, T> = &'a mut dyn FnMut(T) -> Result<()>;

/// Entity-level access to one DSpace repository (source or destination).
///
/// Every call is a blocking round trip that commits on its own; there are no
/// multi-statement transactions. Association reads are streamed through a
/// visitor: the sequence is finite, read once, and never materialized by the
/// store.
pub trait RepositoryStore {
    /// Metadata rows for every item holding `filter.field = filter.value`,
    /// ordered by item id then metadata value id.
    fn select_item_rows(&self, filter: &MetadataFilter) -> Result<Vec<SourceRow>>;

    /// All unqualified `dc.title` values of an item.
    fn find_titles_by_item(&self, item_id: ItemId) -> Result<Vec<String>>;

    /// Ids of every item whose unqualified `dc.title` equals `title` exactly.
    fn find_items_by_title(&self, title: &str) -> Result<Vec<ItemId>>;

    /// Next free item id. Only valid while this process is the sole writer.
    fn next_item_id(&self) -> Result<ItemId>;

    fn create_item(&self, item: &NewItem) -> Result<()>;

    /// Fails with `SchemaFieldMissing` when the field id is not registered.
    fn insert_metadata(&self, value: &NewMetadataValue) -> Result<()>;

    /// Stream the item's (community, collection) memberships.
    fn community_memberships(
        &self,
        item_id: ItemId,
        visit: Visit<'_, CommunityMembership>,
    ) -> Result<()>;

    /// Stream the item's bundle associations (one row per bitstream).
    fn bundle_associations(&self, item_id: ItemId, visit: Visit<'_, BundleAssociation>)
        -> Result<()>;

    // Relinks move a relation from `old_id` to `new_id` and return the number
    // of rows touched. Community and collection ids are assumed identical in
    // both repositories.

    fn relink_community(&self, new_id: ItemId, old_id: ItemId, community_id: i64)
        -> Result<usize>;

    fn relink_collection(&self, new_id: ItemId, old_id: ItemId, collection_id: i64)
        -> Result<usize>;

    fn relink_policies(&self, new_id: ItemId, old_id: ItemId) -> Result<usize>;

    fn relink_bundle(&self, new_id: ItemId, old_id: ItemId, bundle_id: i64) -> Result<usize>;

    /// Re-point the handle of `old_id`, replacing its value when `handle` is given.
    fn relink_handle(&self, new_id: ItemId, old_id: ItemId, handle: Option<&str>)
        -> Result<usize>;

    fn relink_workflow_item(&self, new_id: ItemId, old_id: ItemId) -> Result<usize>;

    fn relink_workspace_item(&self, new_id: ItemId, old_id: ItemId) -> Result<usize>;

    /// Delete every metadata value owned by the item; returns the count removed.
    fn delete_metadata(&self, item_id: ItemId) -> Result<usize>;

    /// Delete the item row and its membership rows.
    ///
    /// Fails with `ForeignKeyViolation` while anything else still references
    /// the item, and with `ItemNotFound` when there is no such row.
    fn delete_item(&self, item_id: ItemId) -> Result<()>;
}

/// Handle maintenance operations used by the handle update job.
pub trait HandleStore: RepositoryStore {
    /// Assign `handle` to the handle row(s) of items titled `title`.
    ///
    /// Returns the updated resource id, or `None` when nothing matched. Fails
    /// with `HandleConflict` when the handle is already assigned elsewhere.
    fn update_handle_by_title(&self, handle: &str, title: &str) -> Result<Option<ItemId>>;

    /// Point the existing `handle` row at `item_id`.
    fn update_handle_by_handle(&self, handle: &str, item_id: ItemId) -> Result<Option<ItemId>>;

    /// Registry id of a dotted metadata field.
    fn find_metadata_field_id(&self, field: &str) -> Result<Option<i64>>;

    /// Overwrite the item's value for `field`; returns the updated value id.
    fn update_metadata_value(&self, field: &str, value: &str, item_id: ItemId)
        -> Result<Option<i64>>;

    /// Insert a metadata value and return its id.
    fn insert_metadata_value(&self, value: &NewMetadataValue) -> Result<i64>;
}
