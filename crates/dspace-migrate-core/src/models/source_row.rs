//! One metadata statement read from the source repository.

use super::item::{ItemId, NewItem, NewMetadataValue};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A source metadata row joined with its item and handle.
///
/// Many rows share one `item_id`; the item-level columns repeat on each of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRow {
    pub item_id: ItemId,
    pub submitter_id: Option<i64>,
    pub in_archive: bool,
    pub withdrawn: bool,
    pub owning_collection: Option<i64>,
    pub last_modified: Option<DateTime<Utc>>,
    pub discoverable: bool,
    pub schema_short_id: String,
    pub element: String,
    pub qualifier: Option<String>,
    pub metadata_field_id: i64,
    pub text_value: Option<String>,
    pub text_lang: Option<String>,
    pub resource_type_id: i32,
    pub handle: Option<String>,
}

impl SourceRow {
    /// Dotted field name, e.g. `dc.contributor.author`.
    pub fn field_name(&self) -> String {
        match &self.qualifier {
            Some(qualifier) => format!("{}.{}.{}", self.schema_short_id, self.element, qualifier),
            None => format!("{}.{}", self.schema_short_id, self.element),
        }
    }

    /// Destination item built from this row's item-level columns.
    ///
    /// Migrated items are never withdrawn and always discoverable, whatever
    /// the source says.
    pub fn to_new_item(&self, id: ItemId) -> NewItem {
        NewItem {
            id,
            submitter_id: self.submitter_id,
            in_archive: self.in_archive,
            withdrawn: false,
            owning_collection: self.owning_collection,
            last_modified: self.last_modified,
            discoverable: true,
        }
    }

    pub fn to_metadata_value(&self, item_id: ItemId) -> NewMetadataValue {
        NewMetadataValue {
            item_id,
            field_id: self.metadata_field_id,
            text_value: self.text_value.clone(),
            text_lang: self.text_lang.clone(),
            resource_type_id: self.resource_type_id,
        }
    }
}

/// Parse a timestamp column as stored by DSpace or by this tool.
///
/// Accepts RFC 3339 and the PostgreSQL text form (`2019-03-04 15:02:11.123`),
/// the latter interpreted as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}
