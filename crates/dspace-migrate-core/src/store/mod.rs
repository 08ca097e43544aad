//! Repository store adapters.
//!
//! The engine only sees the [`RepositoryStore`] contract; [`SqliteRepository`]
//! implements it over the DSpace table layout.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteRepository;
pub use traits::{HandleStore, RepositoryStore, Visit};
