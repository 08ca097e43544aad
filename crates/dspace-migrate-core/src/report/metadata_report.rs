//! Metadata report: one line per item, one column per requested field.

use super::output::{report_file_name, resolve_report_dir, write_report};
use crate::error::{MigrateError, Result};
use crate::models::{ItemId, MetadataField, SourceRow};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Bundle names and file names that leak into metadata but are not metadata.
const DENYLIST: [&str; 3] = ["ORIGINAL", "TEXT", "LICENSE"];
const REJECTED_SUFFIXES: [&str; 2] = [".pdf", ".txt"];

/// Separator for several values landing in one cell.
pub const VALUE_SEPARATOR: &str = "||";

#[derive(Debug, Clone)]
pub struct MetadataReport {
    fields: Vec<MetadataField>,
}

impl MetadataReport {
    pub const KIND: &'static str = "metadata_report";

    pub fn new(fields: Vec<MetadataField>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[MetadataField] {
        &self.fields
    }

    pub fn headers(&self) -> Vec<String> {
        std::iter::once("item_id".to_string())
            .chain(self.fields.iter().map(ToString::to_string))
            .collect()
    }

    pub fn is_rejected(text_value: &str) -> bool {
        DENYLIST.contains(&text_value)
            || REJECTED_SUFFIXES
                .iter()
                .any(|suffix| text_value.ends_with(suffix))
    }

    /// Group the matching values of `rows` by item, in first-seen item order.
    pub fn rows(&self, rows: &[SourceRow]) -> Vec<(ItemId, Vec<Vec<String>>)> {
        let mut order: Vec<ItemId> = Vec::new();
        let mut cells: HashMap<ItemId, Vec<Vec<String>>> = HashMap::new();

        for row in rows {
            let Some(text_value) = row.text_value.as_deref() else {
                continue;
            };
            if Self::is_rejected(text_value) {
                continue;
            }

            let columns: Vec<usize> = self
                .fields
                .iter()
                .enumerate()
                .filter(|(_, field)| {
                    field.matches(&row.schema_short_id, &row.element, row.qualifier.as_deref())
                })
                .map(|(index, _)| index)
                .collect();
            if columns.is_empty() {
                continue;
            }

            let entry = cells.entry(row.item_id).or_insert_with(|| {
                order.push(row.item_id);
                vec![Vec::new(); self.fields.len()]
            });
            for index in columns {
                entry[index].push(text_value.to_string());
            }
        }

        order
            .into_iter()
            .filter_map(|id| cells.remove(&id).map(|values| (id, values)))
            .collect()
    }

    pub fn to_csv(&self, rows: &[SourceRow]) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(self.headers())?;
        for (item_id, values) in self.rows(rows) {
            let mut record = Vec::with_capacity(values.len() + 1);
            record.push(item_id.to_string());
            record.extend(values.iter().map(|cell| cell.join(VALUE_SEPARATOR)));
            writer.write_record(&record)?;
        }
        let bytes = writer.into_inner().map_err(|e| MigrateError::Csv {
            message: format!("Failed to flush metadata report: {}", e),
            source: None,
        })?;
        String::from_utf8(bytes).map_err(|e| MigrateError::Other(e.to_string()))
    }

    /// Write a timestamped report into `directory` and return its path.
    pub fn write_to_dir(&self, directory: &Path, rows: &[SourceRow]) -> Result<PathBuf> {
        let path = resolve_report_dir(directory)?.join(report_file_name(Self::KIND));
        self.write_to_path(&path, rows)?;
        Ok(path)
    }

    pub fn write_to_path(&self, path: &Path, rows: &[SourceRow]) -> Result<()> {
        write_report(path, &self.to_csv(rows)?)
    }
}
