//! dspace-migrate - Reconciles items from a legacy DSpace repository into a
//! target repository.
//!
//! Each source item is matched to exactly one destination item by title. A
//! replacement is created in the destination, the source metadata is copied
//! onto it, the relations of the matched item are moved over, and the matched
//! item is deleted once every row has been processed.
//!
//! # Example
//!
//! ```rust,ignore
//! use dspace_migrate::{MetadataFilter, MigrationJob, MigrationReport, SqliteRepository};
//!
//! fn main() -> dspace_migrate::Result<()> {
//!     let source = SqliteRepository::open("legacy.db")?;
//!     let destination = SqliteRepository::open("dataspace.db")?;
//!
//!     let filter = MetadataFilter::new("dc.date.accessioned".parse()?, "2019-03-04");
//!     let state = MigrationJob::new(&source, &destination).run_filtered(&filter)?;
//!
//!     let report = MigrationReport::new(&state, "legacy", "dataspace");
//!     println!("Wrote {}", report.write_to_dir(".".as_ref())?.display());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod handles;
pub mod migration;
pub mod models;
pub mod report;
pub mod store;

// Re-export commonly used types
pub use config::{AppConfig, DspaceConfig, MigrationConfig, RepositoryConfig, ReportConfig};
pub use error::{MigrateError, Result};
pub use handles::{HandleRecord, HandleUpdateOutcome, UpdateHandlesJob};
pub use migration::{
    DeletionQueueProcessor, DeletionStatus, MigrationEngine, MigrationJob, MigrationState,
    MigrationSummary, RowOutcome, TitleMatch,
};
pub use models::{ItemId, MetadataField, MetadataFilter, SourceRow};
pub use report::{MetadataReport, MigrationReport, ReportState};
pub use store::{HandleStore, RepositoryStore, SqliteRepository};
