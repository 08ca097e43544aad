//! SQLite-backed repository store over the DSpace table layout.

use super::schema::DSPACE_SCHEMA;
use super::traits::{HandleStore, RepositoryStore, Visit};
use crate::config::{DspaceConfig, SqliteConfig};
use crate::error::{MigrateError, Result};
use crate::models::{
    parse_timestamp, BundleAssociation, CommunityMembership, ItemId, MetadataField,
    MetadataFilter, NewItem, NewMetadataValue, SourceRow,
};
use rusqlite::{ffi, params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use tracing::debug;

const SELECT_ITEM_ROWS: &str = r#"
SELECT i.item_id, i.submitter_id, i.in_archive, i.withdrawn, i.owning_collection,
       i.last_modified, i.discoverable, s.short_id, r.element, r.qualifier,
       v.metadata_field_id, v.text_value, v.text_lang, v.resource_type_id, h.handle
  FROM item AS i
  INNER JOIN metadatavalue AS v
          ON v.resource_id = i.item_id AND v.resource_type_id = ?5
  INNER JOIN metadatafieldregistry AS r ON r.metadata_field_id = v.metadata_field_id
  INNER JOIN metadataschemaregistry AS s ON s.metadata_schema_id = r.metadata_schema_id
  LEFT JOIN handle AS h ON h.resource_id = i.item_id AND h.resource_type_id = ?5
 WHERE i.item_id IN (
        SELECT DISTINCT v2.resource_id
          FROM metadatavalue AS v2
          INNER JOIN metadatafieldregistry AS r2 ON r2.metadata_field_id = v2.metadata_field_id
          INNER JOIN metadataschemaregistry AS s2 ON s2.metadata_schema_id = r2.metadata_schema_id
         WHERE v2.text_value = ?4
           AND v2.resource_type_id = ?5
           AND s2.short_id = ?1
           AND r2.element = ?2
           AND r2.qualifier IS ?3
         ORDER BY v2.resource_id
         LIMIT ?6
 )
 ORDER BY i.item_id, v.metadata_value_id
"#;

const SELECT_TITLES_BY_ITEM: &str = r#"
SELECT v.text_value
  FROM item AS i
  INNER JOIN metadatavalue AS v
          ON v.resource_id = i.item_id AND v.resource_type_id = ?2
  INNER JOIN metadatafieldregistry AS r ON r.metadata_field_id = v.metadata_field_id
 WHERE r.metadata_schema_id = ?3
   AND r.element = ?4
   AND r.qualifier IS NULL
   AND v.text_value IS NOT NULL
   AND i.item_id = ?1
 ORDER BY v.metadata_value_id
"#;

const SELECT_ITEMS_BY_TITLE: &str = r#"
SELECT DISTINCT i.item_id
  FROM item AS i
  INNER JOIN metadatavalue AS v
          ON v.resource_id = i.item_id AND v.resource_type_id = ?2
  INNER JOIN metadatafieldregistry AS r ON r.metadata_field_id = v.metadata_field_id
 WHERE r.metadata_schema_id = ?3
   AND r.element = ?4
   AND r.qualifier IS NULL
   AND v.text_value = ?1
 ORDER BY i.item_id
"#;

/// Repository store backed by a single SQLite connection.
///
/// The connection is owned outright rather than shared behind a lock: a
/// migration has exactly one writer, and streamed reads call back into the
/// same store while their statement is still open.
pub struct SqliteRepository {
    path: Option<PathBuf>,
    conn: Connection,
}

impl SqliteRepository {
    /// Open an existing repository database.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if !db_path.exists() {
            return Err(MigrateError::Config {
                message: format!("Repository database does not exist: {}", db_path.display()),
            });
        }

        let conn = Connection::open(db_path).map_err(|e| MigrateError::Database {
            message: format!("Failed to open repository database {}: {}", db_path.display(), e),
            source: Some(e),
        })?;
        Self::configure_connection(&conn)?;

        Ok(Self {
            path: Some(db_path.to_path_buf()),
            conn,
        })
    }

    /// Create (or open) a repository database and make sure the schema exists.
    pub fn create(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| MigrateError::io_with_path(e, parent))?;
            }
        }

        let conn = Connection::open(db_path)?;
        Self::configure_connection(&conn)?;
        let repo = Self {
            path: Some(db_path.to_path_buf()),
            conn,
        };
        repo.ensure_schema()?;
        Ok(repo)
    }

    /// Throwaway in-memory repository with the schema in place.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure_connection(&conn)?;
        let repo = Self { path: None, conn };
        repo.ensure_schema()?;
        Ok(repo)
    }

    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(&format!(
            "PRAGMA foreign_keys=ON;\n\
             PRAGMA busy_timeout={};",
            SqliteConfig::BUSY_TIMEOUT_MS,
        ))
        .map_err(|e| MigrateError::Database {
            message: format!("Failed to set pragmas: {}", e),
            source: Some(e),
        })?;
        Ok(())
    }

    /// Create any missing DSpace tables.
    pub fn ensure_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(DSPACE_SCHEMA)
            .map_err(|e| MigrateError::Database {
                message: format!("Failed to initialize repository schema: {}", e),
                source: Some(e),
            })
    }

    /// Path of the database file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Raw connection, for fixtures and one-off queries.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn field_is_registered(&self, field_id: i64) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM metadatafieldregistry WHERE metadata_field_id = ?1",
                params![field_id],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        Ok(found)
    }

    fn insert_value(&self, value: &NewMetadataValue) -> Result<i64> {
        if !self.field_is_registered(value.field_id)? {
            return Err(MigrateError::SchemaFieldMissing {
                field_id: value.field_id,
            });
        }

        self.conn
            .execute(
                "INSERT INTO metadatavalue
                 (resource_id, metadata_field_id, text_value, text_lang, resource_type_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    value.item_id.get(),
                    value.field_id,
                    value.text_value,
                    value.text_lang,
                    value.resource_type_id
                ],
            )
            .map_err(|e| {
                if extended_code(&e) == Some(ffi::SQLITE_CONSTRAINT_FOREIGNKEY) {
                    MigrateError::SchemaFieldMissing {
                        field_id: value.field_id,
                    }
                } else {
                    MigrateError::from(e)
                }
            })?;

        Ok(self.conn.last_insert_rowid())
    }

    fn returning_ids(&self, sql: &str, params: impl rusqlite::Params) -> rusqlite::Result<Vec<i64>> {
        let mut stmt = self.conn.prepare(sql)?;
        let ids = stmt
            .query_map(params, |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }
}

fn extended_code(err: &rusqlite::Error) -> Option<i32> {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => Some(failure.extended_code),
        _ => None,
    }
}

fn source_row_from(row: &Row<'_>) -> rusqlite::Result<SourceRow> {
    let last_modified: Option<String> = row.get(5)?;
    Ok(SourceRow {
        item_id: ItemId(row.get(0)?),
        submitter_id: row.get(1)?,
        in_archive: row.get(2)?,
        withdrawn: row.get(3)?,
        owning_collection: row.get(4)?,
        last_modified: last_modified.as_deref().and_then(parse_timestamp),
        discoverable: row.get(6)?,
        schema_short_id: row.get(7)?,
        element: row.get(8)?,
        qualifier: row.get(9)?,
        metadata_field_id: row.get(10)?,
        text_value: row.get(11)?,
        text_lang: row.get(12)?,
        resource_type_id: row.get(13)?,
        handle: row.get(14)?,
    })
}

impl RepositoryStore for SqliteRepository {
    fn select_item_rows(&self, filter: &MetadataFilter) -> Result<Vec<SourceRow>> {
        let limit = filter.limit.map(i64::from).unwrap_or(-1);
        let mut stmt = self.conn.prepare(SELECT_ITEM_ROWS)?;
        let rows = stmt
            .query_map(
                params![
                    filter.field.schema,
                    filter.field.element,
                    filter.field.qualifier,
                    filter.value,
                    DspaceConfig::ITEM_RESOURCE_TYPE,
                    limit
                ],
                source_row_from,
            )?
            .collect::<rusqlite::Result<Vec<SourceRow>>>()?;

        debug!(
            "Selected {} metadata rows for {} = {}",
            rows.len(),
            filter.field,
            filter.value
        );
        Ok(rows)
    }

    fn find_titles_by_item(&self, item_id: ItemId) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(SELECT_TITLES_BY_ITEM)?;
        let titles = stmt
            .query_map(
                params![
                    item_id.get(),
                    DspaceConfig::ITEM_RESOURCE_TYPE,
                    DspaceConfig::DC_SCHEMA_ID,
                    DspaceConfig::TITLE_ELEMENT
                ],
                |row| row.get::<_, String>(0),
            )?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(titles)
    }

    fn find_items_by_title(&self, title: &str) -> Result<Vec<ItemId>> {
        let mut stmt = self.conn.prepare(SELECT_ITEMS_BY_TITLE)?;
        let ids = stmt
            .query_map(
                params![
                    title,
                    DspaceConfig::ITEM_RESOURCE_TYPE,
                    DspaceConfig::DC_SCHEMA_ID,
                    DspaceConfig::TITLE_ELEMENT
                ],
                |row| row.get::<_, i64>(0).map(ItemId),
            )?
            .collect::<rusqlite::Result<Vec<ItemId>>>()?;
        Ok(ids)
    }

    fn next_item_id(&self) -> Result<ItemId> {
        let next: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(item_id), 0) + 1 FROM item",
            [],
            |row| row.get(0),
        )?;
        Ok(ItemId(next))
    }

    fn create_item(&self, item: &NewItem) -> Result<()> {
        self.conn.execute(
            "INSERT INTO item
             (item_id, submitter_id, in_archive, withdrawn, owning_collection, last_modified, discoverable)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                item.id.get(),
                item.submitter_id,
                item.in_archive,
                item.withdrawn,
                item.owning_collection,
                item.last_modified.map(|t| t.to_rfc3339()),
                item.discoverable
            ],
        )?;
        Ok(())
    }

    fn insert_metadata(&self, value: &NewMetadataValue) -> Result<()> {
        self.insert_value(value).map(|_| ())
    }

    fn community_memberships(
        &self,
        item_id: ItemId,
        visit: Visit<'_, CommunityMembership>,
    ) -> Result<()> {
        let mut stmt = self.conn.prepare(
            "SELECT coll2i.collection_id, comm2coll.community_id
               FROM community2collection AS comm2coll
               INNER JOIN collection2item AS coll2i
                       ON coll2i.collection_id = comm2coll.collection_id
              WHERE coll2i.item_id = ?1",
        )?;
        let mut rows = stmt.query(params![item_id.get()])?;
        while let Some(row) = rows.next()? {
            visit(CommunityMembership {
                collection_id: row.get(0)?,
                community_id: row.get(1)?,
            })?;
        }
        Ok(())
    }

    fn bundle_associations(
        &self,
        item_id: ItemId,
        visit: Visit<'_, BundleAssociation>,
    ) -> Result<()> {
        let mut stmt = self.conn.prepare(
            "SELECT i2b.bundle_id, b2b.bitstream_id, b2b.bitstream_order
               FROM item2bundle AS i2b
               LEFT JOIN bundle2bitstream AS b2b ON b2b.bundle_id = i2b.bundle_id
              WHERE i2b.item_id = ?1
              ORDER BY i2b.bundle_id, b2b.bitstream_order",
        )?;
        let mut rows = stmt.query(params![item_id.get()])?;
        while let Some(row) = rows.next()? {
            visit(BundleAssociation {
                bundle_id: row.get(0)?,
                bitstream_id: row.get(1)?,
                bitstream_order: row.get(2)?,
            })?;
        }
        Ok(())
    }

    fn relink_community(&self, new_id: ItemId, old_id: ItemId, community_id: i64) -> Result<usize> {
        Ok(self.conn.execute(
            "UPDATE communities2item SET item_id = ?1 WHERE item_id = ?2 AND community_id = ?3",
            params![new_id.get(), old_id.get(), community_id],
        )?)
    }

    fn relink_collection(
        &self,
        new_id: ItemId,
        old_id: ItemId,
        collection_id: i64,
    ) -> Result<usize> {
        Ok(self.conn.execute(
            "UPDATE collection2item SET item_id = ?1 WHERE item_id = ?2 AND collection_id = ?3",
            params![new_id.get(), old_id.get(), collection_id],
        )?)
    }

    fn relink_policies(&self, new_id: ItemId, old_id: ItemId) -> Result<usize> {
        Ok(self.conn.execute(
            "UPDATE resourcepolicy SET resource_id = ?1
              WHERE resource_id = ?2 AND resource_type_id = ?3",
            params![new_id.get(), old_id.get(), DspaceConfig::ITEM_RESOURCE_TYPE],
        )?)
    }

    fn relink_bundle(&self, new_id: ItemId, old_id: ItemId, bundle_id: i64) -> Result<usize> {
        Ok(self.conn.execute(
            "UPDATE item2bundle SET item_id = ?1 WHERE item_id = ?2 AND bundle_id = ?3",
            params![new_id.get(), old_id.get(), bundle_id],
        )?)
    }

    fn relink_handle(&self, new_id: ItemId, old_id: ItemId, handle: Option<&str>) -> Result<usize> {
        Ok(self.conn.execute(
            "UPDATE handle SET resource_id = ?1, handle = COALESCE(?3, handle)
              WHERE resource_id = ?2 AND resource_type_id = ?4",
            params![
                new_id.get(),
                old_id.get(),
                handle,
                DspaceConfig::ITEM_RESOURCE_TYPE
            ],
        )?)
    }

    fn relink_workflow_item(&self, new_id: ItemId, old_id: ItemId) -> Result<usize> {
        Ok(self.conn.execute(
            "UPDATE workflowitem SET item_id = ?1 WHERE item_id = ?2",
            params![new_id.get(), old_id.get()],
        )?)
    }

    fn relink_workspace_item(&self, new_id: ItemId, old_id: ItemId) -> Result<usize> {
        Ok(self.conn.execute(
            "UPDATE workspaceitem SET item_id = ?1 WHERE item_id = ?2",
            params![new_id.get(), old_id.get()],
        )?)
    }

    fn delete_metadata(&self, item_id: ItemId) -> Result<usize> {
        Ok(self.conn.execute(
            "DELETE FROM metadatavalue WHERE resource_id = ?1 AND resource_type_id = ?2",
            params![item_id.get(), DspaceConfig::ITEM_RESOURCE_TYPE],
        )?)
    }

    fn delete_item(&self, item_id: ItemId) -> Result<()> {
        let fk_violation = |e: rusqlite::Error| {
            if extended_code(&e) == Some(ffi::SQLITE_CONSTRAINT_FOREIGNKEY) {
                MigrateError::ForeignKeyViolation {
                    item_id,
                    message: e.to_string(),
                }
            } else {
                MigrateError::from(e)
            }
        };

        for statement in [
            "DELETE FROM communities2item WHERE item_id = ?1",
            "DELETE FROM collection2item WHERE item_id = ?1",
            "DELETE FROM item2bundle WHERE item_id = ?1",
        ] {
            self.conn
                .execute(statement, params![item_id.get()])
                .map_err(fk_violation)?;
        }

        let deleted = self
            .conn
            .execute("DELETE FROM item WHERE item_id = ?1", params![item_id.get()])
            .map_err(fk_violation)?;

        if deleted == 0 {
            return Err(MigrateError::ItemNotFound { item_id });
        }
        Ok(())
    }
}

impl HandleStore for SqliteRepository {
    fn update_handle_by_title(&self, handle: &str, title: &str) -> Result<Option<ItemId>> {
        let ids = self
            .returning_ids(
                "UPDATE handle SET handle = ?1
                  WHERE resource_type_id = ?2
                    AND resource_id IN (
                        SELECT v.resource_id
                          FROM metadatavalue AS v
                          INNER JOIN metadatafieldregistry AS r
                                  ON r.metadata_field_id = v.metadata_field_id
                         WHERE r.metadata_schema_id = ?3
                           AND r.element = ?4
                           AND r.qualifier IS NULL
                           AND v.resource_type_id = ?2
                           AND v.text_value = ?5
                    )
                  RETURNING resource_id",
                params![
                    handle,
                    DspaceConfig::ITEM_RESOURCE_TYPE,
                    DspaceConfig::DC_SCHEMA_ID,
                    DspaceConfig::TITLE_ELEMENT,
                    title
                ],
            )
            .map_err(|e| {
                if extended_code(&e) == Some(ffi::SQLITE_CONSTRAINT_UNIQUE) {
                    MigrateError::HandleConflict {
                        handle: handle.to_string(),
                    }
                } else {
                    MigrateError::from(e)
                }
            })?;

        Ok(ids.into_iter().next().map(ItemId))
    }

    fn update_handle_by_handle(&self, handle: &str, item_id: ItemId) -> Result<Option<ItemId>> {
        let ids = self.returning_ids(
            "UPDATE handle SET resource_id = ?2, resource_type_id = ?3
              WHERE handle = ?1
              RETURNING resource_id",
            params![handle, item_id.get(), DspaceConfig::ITEM_RESOURCE_TYPE],
        )?;
        Ok(ids.into_iter().next().map(ItemId))
    }

    fn find_metadata_field_id(&self, field: &str) -> Result<Option<i64>> {
        let field: MetadataField = field.parse()?;
        let id = self
            .conn
            .query_row(
                "SELECT r.metadata_field_id
                   FROM metadatafieldregistry AS r
                   INNER JOIN metadataschemaregistry AS s
                           ON s.metadata_schema_id = r.metadata_schema_id
                  WHERE s.short_id = ?1 AND r.element = ?2 AND r.qualifier IS ?3",
                params![field.schema, field.element, field.qualifier],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn update_metadata_value(
        &self,
        field: &str,
        value: &str,
        item_id: ItemId,
    ) -> Result<Option<i64>> {
        let Some(field_id) = self.find_metadata_field_id(field)? else {
            return Ok(None);
        };

        let ids = self.returning_ids(
            "UPDATE metadatavalue SET text_value = ?1
              WHERE resource_id = ?2 AND resource_type_id = ?3 AND metadata_field_id = ?4
              RETURNING metadata_value_id",
            params![
                value,
                item_id.get(),
                DspaceConfig::ITEM_RESOURCE_TYPE,
                field_id
            ],
        )?;
        Ok(ids.into_iter().next())
    }

    fn insert_metadata_value(&self, value: &NewMetadataValue) -> Result<i64> {
        self.insert_value(value)
    }
}
