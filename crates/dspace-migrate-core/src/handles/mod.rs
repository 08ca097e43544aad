//! Handle maintenance for items already living in the destination.

mod update_handles;

pub use update_handles::{HandleRecord, HandleUpdateOutcome, UpdateHandlesJob};
