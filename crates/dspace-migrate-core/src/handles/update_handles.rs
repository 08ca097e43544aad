//! Rewrites destination handles from a CSV export.
//!
//! Each CSV row names an ARK identifier URI and the title of the item it
//! belongs to. The job points the item's handle row at the ARK and keeps its
//! `dc.identifier.uri` metadata in step.

use crate::config::DspaceConfig;
use crate::error::{MigrateError, Result};
use crate::models::{ItemId, NewMetadataValue};
use crate::store::HandleStore;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// One CSV row. Other columns are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HandleRecord {
    #[serde(rename = "dc.identifier.uri")]
    pub identifier_uri: String,
    #[serde(rename = "dc.title")]
    pub title: String,
}

impl HandleRecord {
    /// The handle: the identifier URI without the ARK resolver base.
    pub fn handle(&self) -> String {
        self.identifier_uri.replace(DspaceConfig::HANDLE_URI_BASE, "")
    }
}

/// What happened to one CSV row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandleUpdateOutcome {
    pub handle: String,
    pub title: String,
    /// Item the handle now belongs to; `None` when the title matched nothing.
    pub item_id: Option<ItemId>,
    /// Updated or inserted `dc.identifier.uri` value.
    pub metadata_value_id: Option<i64>,
}

impl HandleUpdateOutcome {
    pub fn is_resolved(&self) -> bool {
        self.item_id.is_some()
    }
}

pub struct UpdateHandlesJob<'a, D: ?Sized> {
    destination: &'a D,
}

impl<'a, D> UpdateHandlesJob<'a, D>
where
    D: HandleStore + ?Sized,
{
    pub fn new(destination: &'a D) -> Self {
        Self { destination }
    }

    pub fn read_records(path: &Path) -> Result<Vec<HandleRecord>> {
        let file = std::fs::File::open(path).map_err(|e| MigrateError::io_with_path(e, path))?;
        Self::read_records_from(file)
    }

    /// Parse a headed CSV; both `dc.identifier.uri` and `dc.title` columns are required.
    pub fn read_records_from<R: Read>(reader: R) -> Result<Vec<HandleRecord>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        for required in [DspaceConfig::IDENTIFIER_URI_FIELD, DspaceConfig::TITLE_FIELD] {
            if !headers.iter().any(|h| h == required) {
                return Err(MigrateError::Validation {
                    field: required.to_string(),
                    message: "missing column in handle CSV".to_string(),
                });
            }
        }

        reader
            .deserialize::<HandleRecord>()
            .map(|record| record.map_err(MigrateError::from))
            .collect()
    }

    /// Read `path` and apply every row.
    pub fn run(&self, path: &Path) -> Result<Vec<HandleUpdateOutcome>> {
        let records = Self::read_records(path)?;
        info!("Updating handles for {} rows from {}", records.len(), path.display());
        self.perform(&records)
    }

    pub fn perform(&self, records: &[HandleRecord]) -> Result<Vec<HandleUpdateOutcome>> {
        let mut outcomes = Vec::with_capacity(records.len());
        for record in records {
            outcomes.push(self.update_record(record)?);
        }

        let resolved = outcomes.iter().filter(|o| o.is_resolved()).count();
        info!(
            "Handle update finished: {} of {} rows resolved",
            resolved,
            outcomes.len()
        );
        Ok(outcomes)
    }

    pub fn update_record(&self, record: &HandleRecord) -> Result<HandleUpdateOutcome> {
        let handle = record.handle();
        let item_id = self.update_handle(&handle, &record.title)?;

        let metadata_value_id = match item_id {
            Some(item_id) => self.update_identifier(&record.identifier_uri, item_id)?,
            None => {
                warn!(
                    "Failed to resolve the item for {} and {}",
                    handle, record.title
                );
                None
            }
        };

        Ok(HandleUpdateOutcome {
            handle,
            title: record.title.clone(),
            item_id,
            metadata_value_id,
        })
    }

    fn resolve_by_title(&self, title: &str) -> Result<Option<ItemId>> {
        Ok(self
            .destination
            .find_items_by_title(title)?
            .into_iter()
            .next())
    }

    fn update_handle(&self, handle: &str, title: &str) -> Result<Option<ItemId>> {
        match self.destination.update_handle_by_title(handle, title) {
            Ok(Some(item_id)) => {
                info!("Updated {} for {}", handle, item_id);
                Ok(Some(item_id))
            }
            Ok(None) => {
                warn!("Failed to update {} for {}", handle, title);
                self.resolve_by_title(title)
            }
            Err(MigrateError::HandleConflict { .. }) => {
                debug!(
                    "Handle {} already set for the items matching {}",
                    handle, title
                );
                let Some(item_id) = self.resolve_by_title(title)? else {
                    return Ok(None);
                };
                match self.destination.update_handle_by_handle(handle, item_id)? {
                    Some(_) => info!("Updated {} for {}", handle, item_id),
                    None => warn!("Failed to update {} for {}", handle, item_id),
                }
                Ok(Some(item_id))
            }
            Err(e) => Err(e),
        }
    }

    fn update_identifier(&self, identifier_uri: &str, item_id: ItemId) -> Result<Option<i64>> {
        let field = DspaceConfig::IDENTIFIER_URI_FIELD;

        if let Some(value_id) =
            self.destination
                .update_metadata_value(field, identifier_uri, item_id)?
        {
            info!(
                "Updated the metadata record {} for {} with {}",
                value_id, item_id, identifier_uri
            );
            return Ok(Some(value_id));
        }

        let Some(field_id) = self.destination.find_metadata_field_id(field)? else {
            warn!(
                "Failed to update {} with the identifier {}: {} is not registered",
                item_id, identifier_uri, field
            );
            return Ok(None);
        };

        let value_id = self.destination.insert_metadata_value(&NewMetadataValue {
            item_id,
            field_id,
            text_value: Some(identifier_uri.to_string()),
            text_lang: None,
            resource_type_id: DspaceConfig::ITEM_RESOURCE_TYPE,
        })?;
        info!(
            "Inserted the metadata record {} for {} with {}",
            value_id, item_id, identifier_uri
        );
        Ok(Some(value_id))
    }
}
