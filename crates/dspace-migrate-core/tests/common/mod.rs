//! Integration test helpers for dspace-migrate.
//!
//! Provides an in-memory recording store with failure injection, a source row
//! builder and SQLite fixtures for end-to-end runs.

#![allow(dead_code)]

use dspace_migrate::models::{
    BundleAssociation, CommunityMembership, ItemId, MetadataFilter, NewItem, NewMetadataValue,
    SourceRow,
};
use dspace_migrate::store::{RepositoryStore, SqliteRepository, Visit};
use dspace_migrate::{MigrateError, Result};
use rusqlite::params;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize logging for tests (once).
pub fn init_test_logging() {
    INIT.call_once(|| {
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init()
                .ok();
        }
    });
}

pub const TITLE_FIELD: i64 = 64;
pub const AUTHOR_FIELD: i64 = 3;
pub const URI_FIELD: i64 = 25;
pub const UNREGISTERED_FIELD: i64 = 999;

/// A source row for `item_id` carrying one metadata value.
pub fn row(item_id: i64, field_id: i64, value: &str) -> SourceRow {
    let (element, qualifier) = match field_id {
        TITLE_FIELD => ("title", None),
        AUTHOR_FIELD => ("contributor", Some("author".to_string())),
        URI_FIELD => ("identifier", Some("uri".to_string())),
        _ => ("description", None),
    };
    SourceRow {
        item_id: ItemId(item_id),
        submitter_id: Some(1),
        in_archive: true,
        withdrawn: true,
        owning_collection: Some(9),
        last_modified: None,
        discoverable: false,
        schema_short_id: "dc".to_string(),
        element: element.to_string(),
        qualifier,
        metadata_field_id: field_id,
        text_value: Some(value.to_string()),
        text_lang: None,
        resource_type_id: 2,
        handle: None,
    }
}

/// Every mutating store call, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateItem(ItemId),
    InsertMetadata { item_id: ItemId, field_id: i64 },
    RelinkCommunity { new_id: ItemId, old_id: ItemId, community_id: i64 },
    RelinkCollection { new_id: ItemId, old_id: ItemId, collection_id: i64 },
    RelinkPolicies { new_id: ItemId, old_id: ItemId },
    RelinkBundle { new_id: ItemId, old_id: ItemId, bundle_id: i64 },
    RelinkHandle { new_id: ItemId, old_id: ItemId, handle: Option<String> },
    RelinkWorkflowItem { new_id: ItemId, old_id: ItemId },
    RelinkWorkspaceItem { new_id: ItemId, old_id: ItemId },
    DeleteMetadata(ItemId),
    DeleteItem(ItemId),
}

#[derive(Debug, Default)]
struct Recording {
    rows: Vec<SourceRow>,
    titles: HashMap<ItemId, Vec<String>>,
    items_by_title: HashMap<String, Vec<ItemId>>,
    next_id: i64,
    unknown_fields: HashSet<i64>,
    failing_deletes: HashSet<ItemId>,
    fail_create: bool,
    memberships: HashMap<ItemId, Vec<CommunityMembership>>,
    bundles: HashMap<ItemId, Vec<BundleAssociation>>,
    calls: Vec<Call>,
}

/// Fake [`RepositoryStore`] that records every call.
///
/// The same type plays either side: titles registered with [`with_item`]
/// answer both `find_titles_by_item` and `find_items_by_title`.
///
/// [`with_item`]: RecordingRepository::with_item
#[derive(Debug, Default)]
pub struct RecordingRepository {
    inner: RefCell<Recording>,
}

impl RecordingRepository {
    pub fn new() -> Self {
        init_test_logging();
        let repo = Self::default();
        repo.inner.borrow_mut().next_id = 1;
        repo
    }

    pub fn with_rows(self, rows: Vec<SourceRow>) -> Self {
        self.inner.borrow_mut().rows = rows;
        self
    }

    pub fn with_item(self, item_id: i64, titles: &[&str]) -> Self {
        {
            let mut inner = self.inner.borrow_mut();
            let id = ItemId(item_id);
            for title in titles {
                inner.titles.entry(id).or_default().push(title.to_string());
                let ids = inner.items_by_title.entry(title.to_string()).or_default();
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            if item_id >= inner.next_id {
                inner.next_id = item_id + 1;
            }
        }
        self
    }

    pub fn with_next_id(self, next_id: i64) -> Self {
        self.inner.borrow_mut().next_id = next_id;
        self
    }

    pub fn with_unknown_field(self, field_id: i64) -> Self {
        self.inner.borrow_mut().unknown_fields.insert(field_id);
        self
    }

    pub fn with_failing_delete(self, item_id: i64) -> Self {
        self.inner
            .borrow_mut()
            .failing_deletes
            .insert(ItemId(item_id));
        self
    }

    /// Make `create_item` fail with a database error.
    pub fn with_failing_create(self) -> Self {
        self.inner.borrow_mut().fail_create = true;
        self
    }

    pub fn with_membership(self, item_id: i64, community_id: i64, collection_id: i64) -> Self {
        self.inner
            .borrow_mut()
            .memberships
            .entry(ItemId(item_id))
            .or_default()
            .push(CommunityMembership {
                community_id,
                collection_id,
            });
        self
    }

    pub fn with_bitstream(self, item_id: i64, bundle_id: i64, bitstream_id: Option<i64>) -> Self {
        self.inner
            .borrow_mut()
            .bundles
            .entry(ItemId(item_id))
            .or_default()
            .push(BundleAssociation {
                bundle_id,
                bitstream_id,
                bitstream_order: bitstream_id.map(|_| 1),
            });
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.borrow().calls.clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.inner.borrow().calls.iter().filter(|c| predicate(c)).count()
    }

    pub fn created_items(&self) -> Vec<ItemId> {
        self.inner
            .borrow()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::CreateItem(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn inserted_metadata(&self) -> Vec<(ItemId, i64)> {
        self.inner
            .borrow()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::InsertMetadata { item_id, field_id } => Some((*item_id, *field_id)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.inner.borrow_mut().calls.push(call);
    }
}

impl RepositoryStore for RecordingRepository {
    fn select_item_rows(&self, filter: &MetadataFilter) -> Result<Vec<SourceRow>> {
        let inner = self.inner.borrow();
        let mut selected: Vec<ItemId> = Vec::new();
        for row in &inner.rows {
            let matches = filter.field.schema == row.schema_short_id
                && filter.field.element == row.element
                && filter.field.qualifier == row.qualifier
                && row.text_value.as_deref() == Some(filter.value.as_str());
            if matches && !selected.contains(&row.item_id) {
                selected.push(row.item_id);
            }
        }
        selected.sort();
        if let Some(limit) = filter.limit {
            selected.truncate(limit as usize);
        }

        let mut rows: Vec<SourceRow> = inner
            .rows
            .iter()
            .filter(|row| selected.contains(&row.item_id))
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.item_id);
        Ok(rows)
    }

    fn find_titles_by_item(&self, item_id: ItemId) -> Result<Vec<String>> {
        Ok(self
            .inner
            .borrow()
            .titles
            .get(&item_id)
            .cloned()
            .unwrap_or_default())
    }

    fn find_items_by_title(&self, title: &str) -> Result<Vec<ItemId>> {
        Ok(self
            .inner
            .borrow()
            .items_by_title
            .get(title)
            .cloned()
            .unwrap_or_default())
    }

    fn next_item_id(&self) -> Result<ItemId> {
        Ok(ItemId(self.inner.borrow().next_id))
    }

    fn create_item(&self, item: &NewItem) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail_create {
            return Err(MigrateError::Database {
                message: "connection reset by peer".to_string(),
                source: None,
            });
        }
        if item.id.get() >= inner.next_id {
            inner.next_id = item.id.get() + 1;
        }
        inner.calls.push(Call::CreateItem(item.id));
        Ok(())
    }

    fn insert_metadata(&self, value: &NewMetadataValue) -> Result<()> {
        if self.inner.borrow().unknown_fields.contains(&value.field_id) {
            return Err(MigrateError::SchemaFieldMissing {
                field_id: value.field_id,
            });
        }
        self.record(Call::InsertMetadata {
            item_id: value.item_id,
            field_id: value.field_id,
        });
        Ok(())
    }

    fn community_memberships(
        &self,
        item_id: ItemId,
        visit: Visit<'_, CommunityMembership>,
    ) -> Result<()> {
        let memberships = self
            .inner
            .borrow()
            .memberships
            .get(&item_id)
            .cloned()
            .unwrap_or_default();
        for membership in memberships {
            visit(membership)?;
        }
        Ok(())
    }

    fn bundle_associations(
        &self,
        item_id: ItemId,
        visit: Visit<'_, BundleAssociation>,
    ) -> Result<()> {
        let bundles = self
            .inner
            .borrow()
            .bundles
            .get(&item_id)
            .cloned()
            .unwrap_or_default();
        for association in bundles {
            visit(association)?;
        }
        Ok(())
    }

    fn relink_community(&self, new_id: ItemId, old_id: ItemId, community_id: i64) -> Result<usize> {
        self.record(Call::RelinkCommunity {
            new_id,
            old_id,
            community_id,
        });
        Ok(1)
    }

    fn relink_collection(
        &self,
        new_id: ItemId,
        old_id: ItemId,
        collection_id: i64,
    ) -> Result<usize> {
        self.record(Call::RelinkCollection {
            new_id,
            old_id,
            collection_id,
        });
        Ok(1)
    }

    fn relink_policies(&self, new_id: ItemId, old_id: ItemId) -> Result<usize> {
        self.record(Call::RelinkPolicies { new_id, old_id });
        Ok(1)
    }

    fn relink_bundle(&self, new_id: ItemId, old_id: ItemId, bundle_id: i64) -> Result<usize> {
        self.record(Call::RelinkBundle {
            new_id,
            old_id,
            bundle_id,
        });
        Ok(1)
    }

    fn relink_handle(&self, new_id: ItemId, old_id: ItemId, handle: Option<&str>) -> Result<usize> {
        self.record(Call::RelinkHandle {
            new_id,
            old_id,
            handle: handle.map(str::to_string),
        });
        Ok(1)
    }

    fn relink_workflow_item(&self, new_id: ItemId, old_id: ItemId) -> Result<usize> {
        self.record(Call::RelinkWorkflowItem { new_id, old_id });
        Ok(0)
    }

    fn relink_workspace_item(&self, new_id: ItemId, old_id: ItemId) -> Result<usize> {
        self.record(Call::RelinkWorkspaceItem { new_id, old_id });
        Ok(0)
    }

    fn delete_metadata(&self, item_id: ItemId) -> Result<usize> {
        self.record(Call::DeleteMetadata(item_id));
        Ok(1)
    }

    fn delete_item(&self, item_id: ItemId) -> Result<()> {
        self.record(Call::DeleteItem(item_id));
        if self.inner.borrow().failing_deletes.contains(&item_id) {
            return Err(MigrateError::ForeignKeyViolation {
                item_id,
                message: "FOREIGN KEY constraint failed".to_string(),
            });
        }
        Ok(())
    }
}

// SQLite fixtures

/// Register the `dc` schema and the fields used by the tests.
pub fn seed_registry(repo: &SqliteRepository) {
    repo.connection()
        .execute_batch(
            "INSERT INTO metadataschemaregistry (metadata_schema_id, short_id) VALUES (1, 'dc');
             INSERT INTO metadatafieldregistry (metadata_field_id, metadata_schema_id, element, qualifier)
             VALUES (64, 1, 'title', NULL),
                    (3, 1, 'contributor', 'author'),
                    (25, 1, 'identifier', 'uri'),
                    (12, 1, 'date', 'accessioned');",
        )
        .expect("Failed to seed metadata registry");
}

/// Create a repository database under `dir` with the registry seeded.
pub fn create_repository(dir: &Path, name: &str) -> SqliteRepository {
    let repo = SqliteRepository::create(dir.join(name)).expect("Failed to create repository");
    seed_registry(&repo);
    repo
}

pub fn insert_item(repo: &SqliteRepository, item_id: i64) {
    repo.create_item(&NewItem {
        id: ItemId(item_id),
        submitter_id: Some(1),
        in_archive: true,
        withdrawn: false,
        owning_collection: None,
        last_modified: None,
        discoverable: true,
    })
    .expect("Failed to insert item");
}

pub fn insert_value(repo: &SqliteRepository, item_id: i64, field_id: i64, value: &str) {
    repo.insert_metadata(&NewMetadataValue {
        item_id: ItemId(item_id),
        field_id,
        text_value: Some(value.to_string()),
        text_lang: None,
        resource_type_id: 2,
    })
    .expect("Failed to insert metadata value");
}

pub fn insert_handle(repo: &SqliteRepository, item_id: i64, handle: &str) {
    repo.connection()
        .execute(
            "INSERT INTO handle (handle, resource_type_id, resource_id) VALUES (?1, 2, ?2)",
            params![handle, item_id],
        )
        .expect("Failed to insert handle");
}

pub fn count(repo: &SqliteRepository, sql: &str, item_id: i64) -> i64 {
    repo.connection()
        .query_row(sql, params![item_id], |row| row.get(0))
        .expect("Failed to count rows")
}
