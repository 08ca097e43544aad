//! Dotted metadata field names (`schema.element[.qualifier]`).

use crate::error::{MigrateError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A metadata field such as `dc.contributor.author`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetadataField {
    pub schema: String,
    pub element: String,
    pub qualifier: Option<String>,
}

impl MetadataField {
    pub fn new(schema: &str, element: &str, qualifier: Option<&str>) -> Self {
        Self {
            schema: schema.to_string(),
            element: element.to_string(),
            qualifier: qualifier.map(str::to_string),
        }
    }

    /// Whether a metadata row with these registry coordinates belongs to this field.
    ///
    /// A field named without a qualifier matches every qualifier of its element.
    pub fn matches(&self, schema: &str, element: &str, qualifier: Option<&str>) -> bool {
        if self.schema != schema || self.element != element {
            return false;
        }
        match &self.qualifier {
            None => true,
            Some(wanted) => qualifier == Some(wanted.as_str()),
        }
    }
}

impl FromStr for MetadataField {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |message: &str| MigrateError::Validation {
            field: s.to_string(),
            message: message.to_string(),
        };

        let segments: Vec<&str> = s.trim().split('.').collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(invalid("empty segment in metadata field name"));
        }

        match segments.as_slice() {
            [schema, element] => Ok(Self::new(schema, element, None)),
            [schema, element, qualifier] => Ok(Self::new(schema, element, Some(qualifier))),
            _ => Err(invalid("expected schema.element or schema.element.qualifier")),
        }
    }
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.element)?;
        if let Some(qualifier) = &self.qualifier {
            write!(f, ".{}", qualifier)?;
        }
        Ok(())
    }
}

/// Selects the source items to migrate: every item holding `field = value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataFilter {
    pub field: MetadataField,
    pub value: String,
    /// Cap on the number of distinct items selected.
    pub limit: Option<u32>,
}

impl MetadataFilter {
    pub fn new(field: MetadataField, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: Option<u32>) -> Self {
        self.limit = limit;
        self
    }
}
