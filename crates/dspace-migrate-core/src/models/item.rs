//! Item identifiers and the write-side records sent to a destination store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// DSpace `item.item_id`.
///
/// The same type names items on both sides of a migration; which repository
/// an id belongs to is carried by the context it appears in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub i64);

impl ItemId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ItemId {
    fn from(value: i64) -> Self {
        ItemId(value)
    }
}

/// Item row to create in the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub id: ItemId,
    pub submitter_id: Option<i64>,
    pub in_archive: bool,
    pub withdrawn: bool,
    pub owning_collection: Option<i64>,
    pub last_modified: Option<DateTime<Utc>>,
    pub discoverable: bool,
}

/// Metadata value to attach to a destination item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMetadataValue {
    pub item_id: ItemId,
    pub field_id: i64,
    pub text_value: Option<String>,
    pub text_lang: Option<String>,
    pub resource_type_id: i32,
}

/// One row of an item's community/collection membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommunityMembership {
    pub community_id: i64,
    pub collection_id: i64,
}

/// One row of an item's bundle association.
///
/// Rows are produced per bitstream, so a bundle with several files appears
/// several times; empty bundles appear once with no bitstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundleAssociation {
    pub bundle_id: i64,
    pub bitstream_id: Option<i64>,
    pub bitstream_order: Option<i32>,
}
