//! Data types shared by the stores, the engine and the reports.

mod item;
mod metadata_field;
mod source_row;

pub use item::{BundleAssociation, CommunityMembership, ItemId, NewItem, NewMetadataValue};
pub use metadata_field::{MetadataField, MetadataFilter};
pub use source_row::{parse_timestamp, SourceRow};
