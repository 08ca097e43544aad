//! Error types for dspace-migrate.
//!
//! Only a handful of store failures are recoverable while a migration runs;
//! everything else aborts the batch and the whole run is retried by rerunning it.

use crate::models::ItemId;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the migration library.
#[derive(Debug, Error)]
pub enum MigrateError {
    // Store errors the engine and deletion pass know how to handle
    #[error("Metadata field {field_id} is not registered in the destination schema")]
    SchemaFieldMissing { field_id: i64 },

    #[error("Item {item_id} is still referenced: {message}")]
    ForeignKeyViolation { item_id: ItemId, message: String },

    #[error("Item not found: {item_id}")]
    ItemNotFound { item_id: ItemId },

    #[error("Handle {handle} is already assigned")]
    HandleConflict { handle: String },

    // Database errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("CSV error: {message}")]
    Csv {
        message: String,
        #[source]
        source: Option<csv::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    // Validation errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

impl From<std::io::Error> for MigrateError {
    fn from(err: std::io::Error) -> Self {
        MigrateError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for MigrateError {
    fn from(err: serde_json::Error) -> Self {
        MigrateError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for MigrateError {
    fn from(err: rusqlite::Error) -> Self {
        MigrateError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<csv::Error> for MigrateError {
    fn from(err: csv::Error) -> Self {
        MigrateError::Csv {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl MigrateError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        MigrateError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Whether a failed metadata insert may be skipped without aborting the run.
    ///
    /// Only an unregistered destination field qualifies; any other insert
    /// failure means the destination is in a state the run cannot reason about.
    pub fn is_recoverable_metadata_failure(&self) -> bool {
        matches!(self, MigrateError::SchemaFieldMissing { .. })
    }

    /// Process exit code for the command line front end.
    ///
    /// - 2: configuration or validation problem (nothing was touched)
    /// - 3: database failure (the destination may be partially migrated)
    /// - 4: report or input file failure
    /// - 1: anything else
    pub fn exit_code(&self) -> i32 {
        match self {
            MigrateError::Config { .. } | MigrateError::Validation { .. } => 2,

            MigrateError::Database { .. }
            | MigrateError::SchemaFieldMissing { .. }
            | MigrateError::ForeignKeyViolation { .. }
            | MigrateError::ItemNotFound { .. }
            | MigrateError::HandleConflict { .. } => 3,

            MigrateError::Io { .. } | MigrateError::Json { .. } | MigrateError::Csv { .. } => 4,

            MigrateError::Other(_) => 1,
        }
    }
}
