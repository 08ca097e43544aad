//! Item migration: reconciliation engine, deletion pass and the job tying them together.
//!
//! A run is strictly two-phase. [`MigrationEngine::perform`] consumes the
//! source rows and returns a [`MigrationState`]; [`DeletionQueueProcessor::drain`]
//! takes that state, removes the superseded destination items and hands the
//! state back for reporting.

mod deletion;
mod engine;
mod job;
mod state;

pub use deletion::DeletionQueueProcessor;
pub use engine::{
    merge_title_candidates, MigrationEngine, RowOutcome, TitleMatch, TITLE_CANDIDATES_RULE,
};
pub use job::MigrationJob;
pub use state::{DeletionStatus, MigrationState, MigrationSummary};
